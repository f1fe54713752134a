//! Per-channel MIDI state and note ownership

use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::note::{Note, NoteFactory};

/// Bank number reserved for percussion (MSB 120, LSB 0)
pub const DRUM_BANK: u16 = 0x3C00;

/// "No parameter selected" for RPN/NRPN
pub const RPN_NULL: u16 = 0x3FFF;

const RPN_PITCH_BEND_SENSITIVITY: u16 = 0x0000;
const RPN_FINE_TUNING: u16 = 0x0001;
const RPN_COARSE_TUNING: u16 = 0x0002;
const RPN_MODULATION_DEPTH_RANGE: u16 = 0x0005;

const CENTER_14BIT: u16 = 8192;
const MAX_14BIT: u16 = 16383;

/// Which reset standard the synthesizer follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemMode {
    #[default]
    Default,
    Gm,
    Gs,
    Xg,
}

impl FromStr for SystemMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(SystemMode::Default),
            "gm" => Ok(SystemMode::Gm),
            "gs" => Ok(SystemMode::Gs),
            "xg" => Ok(SystemMode::Xg),
            other => Err(format!("unknown system mode: {}", other)),
        }
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SystemMode::Default => "default",
            SystemMode::Gm => "gm",
            SystemMode::Gs => "gs",
            SystemMode::Xg => "xg",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a note inside a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    /// Key is down
    Playing,
    /// Key released, envelope in its release
    Released,
    /// Fading out after a sound off
    Off,
}

#[derive(Debug, Clone)]
struct ActiveNote {
    note: Note,
    key: u8,
    status: NoteStatus,
}

/// One of the sixteen MIDI channels
#[derive(Debug, Clone)]
pub struct Channel {
    notes: Vec<ActiveNote>,

    default_bank: u16,
    program: u8,
    bank: u16,
    panpot: u16,
    volume: u16,
    expression: u16,
    pressure: u8,
    pitch_bend: u16,
    /// Semitones in the MSB, cents in the LSB
    pitch_bend_sensitivity: u16,
    modulation_depth: u16,
    /// Semitones in the MSB, cents in the LSB
    modulation_depth_range: u16,
    damper: u8,
    sostenuto: u8,
    freeze: u8,
    fine_tuning: u16,
    coarse_tuning: u16,
    rpn: u16,
    nrpn: u16,
    mono: bool,
    mute: bool,
    system_mode: SystemMode,

    frequency_multiplier: f32,
}

impl Channel {
    /// Creates a channel whose reset bank is `default_bank`
    pub fn new(default_bank: u16) -> Self {
        let mut channel = Self {
            notes: Vec::new(),
            default_bank,
            program: 0,
            bank: default_bank,
            panpot: CENTER_14BIT,
            volume: 100 << 7,
            expression: MAX_14BIT,
            pressure: 0,
            pitch_bend: CENTER_14BIT,
            pitch_bend_sensitivity: 2 << 7,
            modulation_depth: 0,
            modulation_depth_range: 50,
            damper: 0,
            sostenuto: 0,
            freeze: 0,
            fine_tuning: CENTER_14BIT,
            coarse_tuning: CENTER_14BIT,
            rpn: RPN_NULL,
            nrpn: RPN_NULL,
            mono: false,
            mute: false,
            system_mode: SystemMode::Default,
            frequency_multiplier: 1.0,
        };
        channel.update_frequency_multiplier();
        channel
    }

    /// Program number handed to the note factory: `(bank << 7) | program`
    pub fn program_number(&self) -> i32 {
        (i32::from(self.bank) << 7) | i32::from(self.program)
    }

    pub fn program(&self) -> u8 {
        self.program
    }

    pub fn bank(&self) -> u16 {
        self.bank
    }

    pub fn is_drum(&self) -> bool {
        is_drum_bank(self.bank)
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    pub fn expression(&self) -> u16 {
        self.expression
    }

    pub fn panpot(&self) -> u16 {
        self.panpot
    }

    pub fn pitch_bend(&self) -> u16 {
        self.pitch_bend
    }

    pub fn pitch_bend_sensitivity(&self) -> u16 {
        self.pitch_bend_sensitivity
    }

    pub fn fine_tuning(&self) -> u16 {
        self.fine_tuning
    }

    pub fn coarse_tuning(&self) -> u16 {
        self.coarse_tuning
    }

    pub fn modulation_depth_range(&self) -> u16 {
        self.modulation_depth_range
    }

    pub fn damper(&self) -> u8 {
        self.damper
    }

    pub fn is_mono(&self) -> bool {
        self.mono
    }

    pub fn is_muted(&self) -> bool {
        self.mute
    }

    pub fn system_mode(&self) -> SystemMode {
        self.system_mode
    }

    /// Frequency ratio applied to every note (bend and tuning)
    pub fn frequency_multiplier(&self) -> f32 {
        self.frequency_multiplier
    }

    /// Number of notes still producing sound
    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    /// Notes with their key held down
    pub fn playing_notes(&self) -> usize {
        self.notes
            .iter()
            .filter(|n| n.status == NoteStatus::Playing)
            .count()
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_system_mode(&mut self, mode: SystemMode) {
        self.system_mode = mode;
    }

    /// Assigns the channel to the rhythm part (or back to melodic)
    pub fn set_drum(&mut self, drum: bool) {
        self.default_bank = if drum { DRUM_BANK } else { 0 };
        self.bank = self.default_bank;
    }

    /// Starts a note. Returns the note's assign group when it has one, so
    /// the caller can choke the rest of the group.
    pub fn note_on(&mut self, factory: &NoteFactory, key: u8, velocity: u8) -> Option<u32> {
        let key = key & 0x7F;
        if velocity == 0 {
            self.note_off(key, 0);
            return None;
        }
        if self.mono {
            self.all_notes_off();
        }
        self.note_off(key, 0);

        let mut note = factory.note_on(
            self.program_number(),
            key,
            velocity & 0x7F,
            self.frequency_multiplier,
        )?;
        note.set_damper(self.damper);
        note.set_sostenuto(self.sostenuto);
        note.set_freeze(self.freeze);
        note.set_vibrato(self.vibrato_cents());
        note.set_tremolo(f32::from(self.pressure) / 127.0);

        let group = note.assign_group();
        self.notes.push(ActiveNote {
            note,
            key,
            status: NoteStatus::Playing,
        });
        (group != 0).then_some(group)
    }

    /// Releases every held instance of `key`
    pub fn note_off(&mut self, key: u8, _velocity: u8) {
        for active in self.notes.iter_mut() {
            if active.key == key && active.status == NoteStatus::Playing {
                active.note.note_off();
                active.status = NoteStatus::Released;
            }
        }
    }

    /// Cuts every note in assign group `group`. With `spare_newest` the most
    /// recently started note is left alone.
    pub fn stop_assign_group(&mut self, group: u32, spare_newest: bool) {
        let count = if spare_newest {
            self.notes.len().saturating_sub(1)
        } else {
            self.notes.len()
        };
        for active in self.notes.iter_mut().take(count) {
            if active.status != NoteStatus::Off && active.note.assign_group() == group {
                active.note.sound_off();
                active.status = NoteStatus::Off;
            }
        }
    }

    pub fn polyphonic_key_pressure(&mut self, key: u8, value: u8) {
        let depth = f32::from(value & 0x7F) / 127.0;
        for active in self.notes.iter_mut().filter(|n| n.key == key) {
            active.note.set_tremolo(depth);
        }
    }

    pub fn channel_pressure(&mut self, value: u8) {
        self.pressure = value & 0x7F;
        let depth = f32::from(self.pressure) / 127.0;
        for active in self.notes.iter_mut() {
            active.note.set_tremolo(depth);
        }
    }

    pub fn program_change(&mut self, program: u8) {
        self.program = program & 0x7F;
    }

    /// 14-bit pitch bend, 8192 is centre
    pub fn set_pitch_bend(&mut self, value: u16) {
        self.pitch_bend = value & MAX_14BIT;
        self.update_frequency_multiplier();
    }

    pub fn control_change(&mut self, control: u8, value: u8) {
        let value = value & 0x7F;
        match control {
            0 => self.bank_select(set_msb(self.bank, value)),
            32 => self.bank_select(set_lsb(self.bank, value)),
            1 => self.set_modulation_depth(set_msb(self.modulation_depth, value)),
            33 => self.set_modulation_depth(set_lsb(self.modulation_depth, value)),
            6 => self.data_entry(value, true),
            38 => self.data_entry(value, false),
            7 => self.volume = set_msb(self.volume, value),
            39 => self.volume = set_lsb(self.volume, value),
            10 => self.panpot = set_msb(self.panpot, value),
            42 => self.panpot = set_lsb(self.panpot, value),
            11 => self.expression = set_msb(self.expression, value),
            43 => self.expression = set_lsb(self.expression, value),
            64 => self.set_damper(value),
            66 => self.set_sostenuto(value),
            69 => self.set_freeze(value),
            96 => self.data_step(1),
            97 => self.data_step(-1),
            98 => {
                self.nrpn = set_lsb(self.nrpn, value);
                self.rpn = RPN_NULL;
            }
            99 => {
                self.nrpn = set_msb(self.nrpn, value);
                self.rpn = RPN_NULL;
            }
            100 => {
                self.rpn = set_lsb(self.rpn, value);
                self.nrpn = RPN_NULL;
            }
            101 => {
                self.rpn = set_msb(self.rpn, value);
                self.nrpn = RPN_NULL;
            }
            120 => self.all_sound_off(),
            121 => self.reset_all_controllers(),
            123 => self.all_notes_off(),
            126 => {
                self.all_notes_off();
                self.mono = true;
            }
            127 => {
                self.all_notes_off();
                self.mono = false;
            }
            _ => {}
        }
    }

    /// Applies a 14-bit bank number according to the system mode
    pub fn bank_select(&mut self, value: u16) {
        let value = value & MAX_14BIT;
        match self.system_mode {
            SystemMode::Gm => {}
            SystemMode::Gs => {
                if is_drum_bank(self.bank) == is_drum_bank(value) {
                    self.bank = value;
                }
            }
            SystemMode::Xg => {
                if self.default_bank == DRUM_BANK || (value >> 7) == 0x7F {
                    self.bank = DRUM_BANK;
                } else {
                    self.bank = value;
                }
            }
            SystemMode::Default => {
                self.bank = if self.default_bank == DRUM_BANK {
                    DRUM_BANK
                } else {
                    value
                };
            }
        }
    }

    pub fn set_damper(&mut self, value: u8) {
        self.damper = value & 0x7F;
        for active in self.notes.iter_mut() {
            active.note.set_damper(self.damper);
        }
    }

    pub fn set_sostenuto(&mut self, value: u8) {
        self.sostenuto = value & 0x7F;
        for active in self.notes.iter_mut() {
            active.note.set_sostenuto(self.sostenuto);
        }
    }

    pub fn set_freeze(&mut self, value: u8) {
        self.freeze = value & 0x7F;
        for active in self.notes.iter_mut() {
            active.note.set_freeze(self.freeze);
        }
    }

    pub fn all_notes_off(&mut self) {
        for active in self.notes.iter_mut() {
            if active.status == NoteStatus::Playing {
                active.note.note_off();
                active.status = NoteStatus::Released;
            }
        }
    }

    pub fn all_sound_off(&mut self) {
        for active in self.notes.iter_mut() {
            if active.status != NoteStatus::Off {
                active.note.sound_off();
                active.status = NoteStatus::Off;
            }
        }
    }

    /// Drops every note without a fade
    pub fn all_sound_off_immediately(&mut self) {
        self.notes.clear();
    }

    pub fn reset_all_controllers(&mut self) {
        self.expression = MAX_14BIT;
        self.pressure = 0;
        self.pitch_bend = CENTER_14BIT;
        self.modulation_depth = 0;
        self.rpn = RPN_NULL;
        self.nrpn = RPN_NULL;
        self.set_damper(0);
        self.set_sostenuto(0);
        self.set_freeze(0);
        self.channel_pressure(0);
        self.update_modulation();
        self.update_frequency_multiplier();
    }

    /// Returns program, bank and every controller to power-on values
    pub fn reset_all_parameters(&mut self) {
        self.program = 0;
        self.bank = self.default_bank;
        self.panpot = CENTER_14BIT;
        self.volume = 100 << 7;
        self.pitch_bend_sensitivity = 2 << 7;
        self.modulation_depth_range = 50;
        self.fine_tuning = CENTER_14BIT;
        self.coarse_tuning = CENTER_14BIT;
        self.mono = false;
        self.mute = false;
        self.reset_all_controllers();
    }

    /// Renders every note into `out` (interleaved stereo) and drops the ones
    /// that finished.
    pub fn synthesize(&mut self, out: &mut [i32], rate: f32, master_volume: u16, master_balance: u16) {
        if self.notes.is_empty() {
            return;
        }

        let gain = if self.mute {
            0.0
        } else {
            let full = f64::from(MAX_14BIT);
            let level = f64::from(master_volume.min(MAX_14BIT))
                * f64::from(self.volume)
                * f64::from(self.expression)
                / (full * full * full);
            (level * level * full) as f32
        };

        for active in self.notes.iter_mut() {
            let pan = blend_pan(blend_pan(active.note.panpot(), self.panpot), master_balance);
            let angle = pan as f32 / 16384.0 * FRAC_PI_2;
            let left = (gain * angle.cos() * 16384.0 / 16383.0) as i32;
            let right = (gain * angle.sin() * 16384.0 / 16383.0) as i32;
            active.note.synthesize(out, rate, left, right);
        }
        self.notes.retain(|active| !active.note.is_finished());
    }

    fn set_modulation_depth(&mut self, value: u16) {
        self.modulation_depth = value;
        self.update_modulation();
    }

    fn vibrato_cents(&self) -> f32 {
        let range = f32::from(self.modulation_depth_range >> 7) * 100.0
            + f32::from(self.modulation_depth_range & 0x7F);
        f32::from(self.modulation_depth) / f32::from(MAX_14BIT) * range
    }

    fn update_modulation(&mut self) {
        let cents = self.vibrato_cents();
        for active in self.notes.iter_mut() {
            active.note.set_vibrato(cents);
        }
    }

    fn update_frequency_multiplier(&mut self) {
        let sensitivity = f32::from(self.pitch_bend_sensitivity >> 7) * 100.0
            + f32::from(self.pitch_bend_sensitivity & 0x7F);
        let bend = (f32::from(self.pitch_bend) - 8192.0) / 8192.0 * sensitivity;
        let fine = (f32::from(self.fine_tuning) - 8192.0) / 8192.0 * 100.0;
        let coarse = (f32::from(self.coarse_tuning >> 7) - 64.0) * 100.0;
        self.frequency_multiplier = 2f32.powf((bend + fine + coarse) / 1200.0);
        for active in self.notes.iter_mut() {
            active.note.set_frequency_multiplier(self.frequency_multiplier);
        }
    }

    fn rpn_value(&self) -> Option<u16> {
        match self.rpn {
            RPN_PITCH_BEND_SENSITIVITY => Some(self.pitch_bend_sensitivity),
            RPN_FINE_TUNING => Some(self.fine_tuning),
            RPN_COARSE_TUNING => Some(self.coarse_tuning),
            RPN_MODULATION_DEPTH_RANGE => Some(self.modulation_depth_range),
            _ => None,
        }
    }

    fn set_rpn_value(&mut self, value: u16) {
        trace!("RPN {:04X} = {:04X}", self.rpn, value);
        match self.rpn {
            RPN_PITCH_BEND_SENSITIVITY => {
                self.pitch_bend_sensitivity = value;
                self.update_frequency_multiplier();
            }
            RPN_FINE_TUNING => {
                self.fine_tuning = value;
                self.update_frequency_multiplier();
            }
            RPN_COARSE_TUNING => {
                self.coarse_tuning = value;
                self.update_frequency_multiplier();
            }
            RPN_MODULATION_DEPTH_RANGE => {
                self.modulation_depth_range = value;
                self.update_modulation();
            }
            _ => {}
        }
    }

    fn data_entry(&mut self, value: u8, msb: bool) {
        // NRPNs are accepted but have no targets
        if let Some(current) = self.rpn_value() {
            let next = if msb {
                set_msb(current, value)
            } else {
                set_lsb(current, value)
            };
            self.set_rpn_value(next);
        }
    }

    fn data_step(&mut self, direction: i32) {
        if let Some(current) = self.rpn_value() {
            let unit = if self.rpn == RPN_COARSE_TUNING { 1 << 7 } else { 1 };
            let next = (i32::from(current) + direction * unit).clamp(0, i32::from(MAX_14BIT));
            self.set_rpn_value(next as u16);
        }
    }
}

/// Any LSB under MSB 120 selects a percussion bank
fn is_drum_bank(bank: u16) -> bool {
    bank & 0x3F80 == DRUM_BANK
}

/// Moves `inner` toward the side `outer` points at. The offset of `inner`
/// from centre shrinks as `outer` moves away from centre, so a hard
/// `outer` always wins.
fn blend_pan(inner: u16, outer: u16) -> u16 {
    let center = i32::from(CENTER_14BIT);
    let inner = i32::from(inner.min(MAX_14BIT)) - center;
    let outer = i32::from(outer.min(MAX_14BIT)) - center;
    let pan = inner * (center - outer.abs()) / center + outer + center;
    pan.clamp(0, i32::from(MAX_14BIT)) as u16
}

fn set_msb(current: u16, value: u8) -> u16 {
    (u16::from(value & 0x7F) << 7) | (current & 0x7F)
}

fn set_lsb(current: u16, value: u8) -> u16 {
    (current & !0x7F) | u16::from(value & 0x7F)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> NoteFactory {
        NoteFactory::default()
    }

    fn select_rpn(channel: &mut Channel, rpn: u16) {
        channel.control_change(101, (rpn >> 7) as u8);
        channel.control_change(100, (rpn & 0x7F) as u8);
    }

    #[test]
    fn test_system_mode_parsing() {
        assert_eq!("GS".parse::<SystemMode>(), Ok(SystemMode::Gs));
        assert_eq!("xg".parse::<SystemMode>(), Ok(SystemMode::Xg));
        assert!("mt32".parse::<SystemMode>().is_err());
        assert_eq!(SystemMode::Gm.to_string(), "gm");
    }

    #[test]
    fn test_note_on_and_off() {
        let factory = factory();
        let mut channel = Channel::new(0);
        assert_eq!(channel.note_on(&factory, 60, 100), None);
        assert_eq!(channel.playing_notes(), 1);
        channel.note_off(60, 0);
        assert_eq!(channel.playing_notes(), 0);
        assert_eq!(channel.active_notes(), 1);
    }

    #[test]
    fn test_zero_velocity_releases() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.note_on(&factory, 60, 100);
        channel.note_on(&factory, 60, 0);
        assert_eq!(channel.playing_notes(), 0);
    }

    #[test]
    fn test_retrigger_releases_previous() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.note_on(&factory, 60, 100);
        channel.note_on(&factory, 60, 100);
        assert_eq!(channel.active_notes(), 2);
        assert_eq!(channel.playing_notes(), 1);
    }

    #[test]
    fn test_mono_mode() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.control_change(126, 1);
        channel.note_on(&factory, 60, 100);
        channel.note_on(&factory, 64, 100);
        assert_eq!(channel.playing_notes(), 1);
        channel.control_change(127, 0);
        assert!(!channel.is_mono());
        channel.note_on(&factory, 67, 100);
        assert_eq!(channel.playing_notes(), 1);
        channel.note_on(&factory, 69, 100);
        assert_eq!(channel.playing_notes(), 2);
    }

    #[test]
    fn test_fourteen_bit_controllers() {
        let mut channel = Channel::new(0);
        channel.control_change(7, 64);
        channel.control_change(39, 3);
        assert_eq!(channel.volume(), (64 << 7) | 3);
        channel.control_change(10, 0);
        assert_eq!(channel.panpot(), 0);
        channel.control_change(11, 100);
        assert_eq!(channel.expression(), (100 << 7) | 0x7F);
    }

    #[test]
    fn test_pitch_bend_sensitivity_rpn() {
        let mut channel = Channel::new(0);
        select_rpn(&mut channel, 0);
        channel.control_change(6, 12);
        channel.control_change(38, 0);
        assert_eq!(channel.pitch_bend_sensitivity(), 12 << 7);
        channel.set_pitch_bend(16383);
        assert!((channel.frequency_multiplier() - 2.0).abs() < 0.01);
        channel.set_pitch_bend(0);
        assert!((channel.frequency_multiplier() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_tuning_rpns() {
        let mut channel = Channel::new(0);
        select_rpn(&mut channel, 2);
        channel.control_change(6, 76);
        assert!((channel.frequency_multiplier() - 2.0).abs() < 1e-3);
        channel.control_change(97, 0);
        assert_eq!(channel.coarse_tuning() >> 7, 75);
        select_rpn(&mut channel, 1);
        channel.control_change(96, 0);
        assert_eq!(channel.fine_tuning(), CENTER_14BIT + 1);
    }

    #[test]
    fn test_nrpn_deselects_rpn() {
        let mut channel = Channel::new(0);
        select_rpn(&mut channel, 0);
        channel.control_change(99, 1);
        channel.control_change(98, 8);
        channel.control_change(6, 40);
        assert_eq!(channel.pitch_bend_sensitivity(), 2 << 7);
    }

    #[test]
    fn test_null_rpn_ignores_data_entry() {
        let mut channel = Channel::new(0);
        select_rpn(&mut channel, RPN_NULL);
        channel.control_change(6, 40);
        assert_eq!(channel.pitch_bend_sensitivity(), 2 << 7);
        assert_eq!(channel.fine_tuning(), CENTER_14BIT);
    }

    #[test]
    fn test_bank_select_gm_ignores() {
        let mut channel = Channel::new(0);
        channel.set_system_mode(SystemMode::Gm);
        channel.control_change(0, 8);
        assert_eq!(channel.bank(), 0);
    }

    #[test]
    fn test_bank_select_gs_keeps_drum_class() {
        let mut channel = Channel::new(0);
        channel.set_system_mode(SystemMode::Gs);
        channel.control_change(0, 8);
        assert_eq!(channel.bank(), 8 << 7);
        channel.control_change(0, 120);
        assert_eq!(channel.bank(), 8 << 7);

        let mut drums = Channel::new(DRUM_BANK);
        drums.set_system_mode(SystemMode::Gs);
        drums.control_change(0, 8);
        assert_eq!(drums.bank(), DRUM_BANK);
    }

    #[test]
    fn test_bank_select_xg_maps_drums() {
        let mut channel = Channel::new(0);
        channel.set_system_mode(SystemMode::Xg);
        channel.control_change(0, 127);
        assert!(channel.is_drum());
        channel.control_change(0, 0);
        assert_eq!(channel.bank(), 0);
    }

    #[test]
    fn test_bank_select_xg_keeps_drum_part() {
        let mut drums = Channel::new(DRUM_BANK);
        drums.set_system_mode(SystemMode::Xg);
        drums.control_change(0, 127);
        drums.control_change(32, 0);
        assert_eq!(drums.bank(), DRUM_BANK);
        assert!(drums.is_drum());
        drums.control_change(0, 0);
        assert!(drums.is_drum());
    }

    #[test]
    fn test_bank_select_gs_drum_variation() {
        let mut drums = Channel::new(DRUM_BANK);
        drums.set_system_mode(SystemMode::Gs);
        drums.control_change(0, 120);
        drums.control_change(32, 1);
        assert_eq!(drums.bank(), DRUM_BANK | 1);
        assert!(drums.is_drum());

        let mut melodic = Channel::new(0);
        melodic.set_system_mode(SystemMode::Gs);
        melodic.control_change(32, 1);
        melodic.control_change(0, 120);
        assert_eq!(melodic.bank(), 1);
        assert!(!melodic.is_drum());
    }

    #[test]
    fn test_bank_select_default_pins_drums() {
        let mut drums = Channel::new(DRUM_BANK);
        drums.control_change(0, 0);
        assert!(drums.is_drum());
        let mut melodic = Channel::new(0);
        melodic.control_change(0, 1);
        assert_eq!(melodic.bank(), 1 << 7);
    }

    #[test]
    fn test_assign_group_choke() {
        let factory = factory();
        let mut drums = Channel::new(DRUM_BANK);
        assert_eq!(drums.note_on(&factory, 42, 100), Some(1));
        assert_eq!(drums.note_on(&factory, 46, 100), Some(1));
        drums.stop_assign_group(1, true);
        assert_eq!(drums.playing_notes(), 1);
        assert_eq!(drums.note_on(&factory, 36, 100), None);
    }

    #[test]
    fn test_reset_all_controllers() {
        let mut channel = Channel::new(0);
        channel.control_change(64, 127);
        channel.control_change(11, 10);
        channel.set_pitch_bend(0);
        channel.control_change(121, 0);
        assert_eq!(channel.damper(), 0);
        assert_eq!(channel.expression(), MAX_14BIT);
        assert_eq!(channel.pitch_bend(), CENTER_14BIT);
        assert!((channel.frequency_multiplier() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset_all_parameters() {
        let mut channel = Channel::new(0);
        channel.program_change(40);
        channel.control_change(0, 3);
        channel.control_change(7, 10);
        channel.set_mute(true);
        channel.reset_all_parameters();
        assert_eq!(channel.program(), 0);
        assert_eq!(channel.bank(), 0);
        assert_eq!(channel.volume(), 100 << 7);
        assert!(!channel.is_muted());
    }

    #[test]
    fn test_synthesize_removes_finished_notes() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.note_on(&factory, 69, 127);
        let mut out = vec![0i32; 2 * 256];
        channel.synthesize(&mut out, 44100.0, MAX_14BIT, CENTER_14BIT);
        assert!(out.iter().any(|&s| s != 0));
        channel.all_sound_off();
        for _ in 0..10 {
            out.iter_mut().for_each(|s| *s = 0);
            channel.synthesize(&mut out, 44100.0, MAX_14BIT, CENTER_14BIT);
        }
        assert_eq!(channel.active_notes(), 0);
    }

    #[test]
    fn test_pan_hard_left() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.control_change(10, 0);
        channel.note_on(&factory, 69, 127);
        let mut out = vec![0i32; 2 * 256];
        channel.synthesize(&mut out, 44100.0, MAX_14BIT, CENTER_14BIT);
        assert!(out.chunks(2).all(|f| f[1] == 0));
        assert!(out.chunks(2).any(|f| f[0] != 0));
    }

    #[test]
    fn test_muted_channel_is_silent() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.set_mute(true);
        channel.note_on(&factory, 69, 127);
        let mut out = vec![0i32; 2 * 256];
        channel.synthesize(&mut out, 44100.0, MAX_14BIT, CENTER_14BIT);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(channel.active_notes(), 1);
    }

    fn render_note(channel: &mut Channel, frames: usize) -> Vec<i32> {
        let factory = factory();
        channel.note_on(&factory, 69, 127);
        let mut out = vec![0i32; 2 * frames];
        channel.synthesize(&mut out, 44100.0, MAX_14BIT, CENTER_14BIT);
        out
    }

    #[test]
    fn test_pans_blend_instead_of_adding() {
        let factory = factory();
        let mut channel = Channel::new(0);
        channel.control_change(10, 96);
        channel.note_on(&factory, 69, 127);
        let mut out = vec![0i32; 2 * 1024];
        // balance 96 on top of channel pan 96 lands at 112, not hard right
        channel.synthesize(&mut out, 44100.0, MAX_14BIT, 96 << 7);
        let left: i64 = out.chunks(2).map(|f| i64::from(f[0]).abs()).sum();
        let right: i64 = out.chunks(2).map(|f| i64::from(f[1]).abs()).sum();
        assert!(left * 10 > right, "left {} right {}", left, right);
        assert!(left < right);
    }

    #[test]
    fn test_blend_pan() {
        assert_eq!(blend_pan(CENTER_14BIT, 96 << 7), 96 << 7);
        assert_eq!(blend_pan(96 << 7, CENTER_14BIT), 96 << 7);
        assert_eq!(blend_pan(MAX_14BIT, 0), 0);
        assert_eq!(blend_pan(CENTER_14BIT, MAX_14BIT), MAX_14BIT);
        assert_eq!(blend_pan(MAX_14BIT, MAX_14BIT), MAX_14BIT);
    }

    #[test]
    fn test_note_inherits_modulation_and_pressure() {
        let plain = render_note(&mut Channel::new(0), 8192);

        let mut vibrato = Channel::new(0);
        vibrato.control_change(1, 127);
        assert_ne!(render_note(&mut vibrato, 8192), plain);

        let mut tremolo = Channel::new(0);
        tremolo.channel_pressure(127);
        assert_ne!(render_note(&mut tremolo, 8192), plain);
    }
}
