use crate::channel::{Channel, SystemMode, DRUM_BANK};
use crate::note::NoteFactory;
use crate::sequencer::OutputSink;
use log::debug;

/// Number of MIDI channels
pub const NUM_CHANNELS: usize = 16;

/// Channel that plays percussion after a reset
pub const DRUM_CHANNEL: usize = 9;

const CENTER_14BIT: u16 = 8192;
const MAX_14BIT: u16 = 16383;

/// Sixteen-channel MIDI synthesizer
#[derive(Debug, Clone)]
pub struct Synthesizer {
    channels: [Channel; NUM_CHANNELS],
    factory: NoteFactory,
    master_volume: u16,
    master_balance: u16,
    system_mode: SystemMode,
}

impl Synthesizer {
    /// Create a synthesizer playing notes from `factory`
    pub fn new(factory: NoteFactory) -> Self {
        let mut synth = Self {
            channels: std::array::from_fn(|i| Channel::new(default_bank(i))),
            factory,
            master_volume: MAX_14BIT,
            master_balance: CENTER_14BIT,
            system_mode: SystemMode::Default,
        };
        synth.reset();
        synth
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    pub fn factory(&self) -> &NoteFactory {
        &self.factory
    }

    pub fn master_volume(&self) -> u16 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: u16) {
        self.master_volume = volume.min(MAX_14BIT);
    }

    pub fn master_balance(&self) -> u16 {
        self.master_balance
    }

    pub fn set_master_balance(&mut self, balance: u16) {
        self.master_balance = balance.min(MAX_14BIT);
    }

    pub fn system_mode(&self) -> SystemMode {
        self.system_mode
    }

    /// Switches the reset standard and resets every channel
    pub fn set_system_mode(&mut self, mode: SystemMode) {
        self.system_mode = mode;
        self.reset();
    }

    /// Number of notes still producing sound, all channels
    pub fn active_notes(&self) -> usize {
        self.channels.iter().map(Channel::active_notes).sum()
    }

    /// Returns every channel to its power-on state in the current mode
    pub fn reset(&mut self) {
        debug!("SYNTH: reset ({})", self.system_mode);
        self.master_volume = MAX_14BIT;
        self.master_balance = CENTER_14BIT;
        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.all_sound_off();
            channel.set_system_mode(self.system_mode);
            channel.set_drum(i == DRUM_CHANNEL);
            channel.reset_all_parameters();
        }
    }

    pub fn all_sound_off(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.all_sound_off();
        }
    }

    /// Drops every note at once, without a fade
    pub fn all_sound_off_immediately(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.all_sound_off_immediately();
        }
    }

    /// Starts a note and chokes the rest of its assign group on every channel
    pub fn note_on(&mut self, channel: usize, key: u8, velocity: u8) {
        let Some(target) = self.channels.get_mut(channel) else {
            return;
        };
        if let Some(group) = target.note_on(&self.factory, key, velocity) {
            for (i, other) in self.channels.iter_mut().enumerate() {
                other.stop_assign_group(group, i == channel);
            }
        }
    }

    /// Decodes a packed short message: `status | data1 << 8 | data2 << 16`
    pub fn midi_message(&mut self, message: u32) {
        let status = (message & 0xFF) as u8;
        let data1 = ((message >> 8) & 0x7F) as u8;
        let data2 = ((message >> 16) & 0x7F) as u8;
        let channel = usize::from(status & 0x0F);

        match status & 0xF0 {
            0x80 => self.channels[channel].note_off(data1, data2),
            0x90 => self.note_on(channel, data1, data2),
            0xA0 => self.channels[channel].polyphonic_key_pressure(data1, data2),
            0xB0 => self.channels[channel].control_change(data1, data2),
            0xC0 => self.channels[channel].program_change(data1),
            0xD0 => self.channels[channel].channel_pressure(data1),
            0xE0 => self.channels[channel]
                .set_pitch_bend((u16::from(data2) << 7) | u16::from(data1)),
            _ => {
                if status == 0xFF {
                    self.reset();
                }
            }
        }
    }

    /// Handles a system exclusive message, including its leading 0xF0
    pub fn sysex(&mut self, data: &[u8]) {
        match data {
            [0xF0, 0x7E, _, 0x09, 0x01, 0xF7] => self.set_system_mode(SystemMode::Gm),
            [0xF0, 0x7E, _, 0x09, 0x02, 0xF7] => self.set_system_mode(SystemMode::Default),
            [0xF0, 0x41, _, 0x42, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41, 0xF7] => {
                self.set_system_mode(SystemMode::Gs)
            }
            [0xF0, 0x43, device, 0x4C, 0x00, 0x00, 0x7E, 0x00, 0xF7] if device & 0xF0 == 0x10 => {
                self.set_system_mode(SystemMode::Xg)
            }
            [0xF0, 0x7F, _, 0x04, 0x01, lsb, msb, 0xF7] => {
                self.set_master_volume((u16::from(*msb & 0x7F) << 7) | u16::from(*lsb & 0x7F))
            }
            [0xF0, 0x7F, _, 0x04, 0x02, lsb, msb, 0xF7] => {
                self.set_master_balance((u16::from(*msb & 0x7F) << 7) | u16::from(*lsb & 0x7F))
            }
            [0xF0, 0x41, _, 0x42, 0x12, 0x40, part, 0x15, value, _, 0xF7] if part & 0xF0 == 0x10 => {
                if let Some(channel) = gs_part_channel(*part & 0x0F) {
                    self.channels[channel].set_drum(*value != 0);
                }
            }
            _ => debug!("SYNTH: ignoring sysex ({} bytes)", data.len()),
        }
    }

    /// Renders `out.len() / 2` interleaved stereo frames into `out`
    pub fn synthesize(&mut self, out: &mut [i32], rate: f32) {
        out.fill(0);
        for channel in self.channels.iter_mut() {
            channel.synthesize(out, rate, self.master_volume, self.master_balance);
        }
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(NoteFactory::default())
    }
}

impl OutputSink for Synthesizer {
    fn midi_message(&mut self, _port: usize, message: u32) {
        Synthesizer::midi_message(self, message);
    }

    fn sysex_message(&mut self, _port: usize, data: &[u8]) {
        self.sysex(data);
    }

    fn meta_event(&mut self, _kind: u8, _data: &[u8]) {}

    fn reset(&mut self) {
        Synthesizer::reset(self);
    }
}

fn default_bank(channel: usize) -> u16 {
    if channel == DRUM_CHANNEL {
        DRUM_BANK
    } else {
        0
    }
}

/// GS block numbers put part 10 first
fn gs_part_channel(block: u8) -> Option<usize> {
    match block {
        0 => Some(9),
        1..=9 => Some(usize::from(block) - 1),
        10..=15 => Some(usize::from(block)),
        _ => None,
    }
}
