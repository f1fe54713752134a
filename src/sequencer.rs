//! SMF sequencer
//!
//! Flattens every track of a file into one time-ordered message list and
//! replays it against a time cursor into an [`OutputSink`]. Times are
//! microseconds from the start of the song.

use anyhow::{bail, Result};
use log::{debug, warn};

use crate::smf::{self, Division, EventKind};

/// Tempo assumed until the first tempo event (120 BPM)
pub const DEFAULT_TEMPO: u32 = 500_000;

const META_MARKER: u8 = 0x06;
const META_PORT: u8 = 0x21;
const META_TEMPO: u8 = 0x51;
const LOOP_MARKER: &str = "loopStart";
const LOOP_CONTROLLER: u8 = 111;

/// Receiver of replayed messages
pub trait OutputSink {
    /// Packed short message: `status | data1 << 8 | data2 << 16`
    fn midi_message(&mut self, port: usize, message: u32);
    /// System exclusive message, including its leading 0xF0
    fn sysex_message(&mut self, port: usize, data: &[u8]);
    fn meta_event(&mut self, kind: u8, data: &[u8]);
    /// Called before replay starts over from the beginning
    fn reset(&mut self);
}

/// Body of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageData {
    /// Packed status and data bytes
    Short(u32),
    /// Index into the long message table
    Long(usize),
}

/// One replayable event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    /// Microseconds from the start of the song
    pub time: u64,
    pub data: MessageData,
    pub port: usize,
    pub track: usize,
}

/// Variable-length payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LongMessage {
    SysEx(Vec<u8>),
    Meta { kind: u8, data: Vec<u8> },
}

/// A tempo in force from `tick` onwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    /// Microseconds at `tick`
    pub time: u64,
    /// Microseconds per quarter note
    pub tempo: u32,
}

/// Piecewise-constant tempo history for tick to time conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoMap {
    ticks_per_quarter: u16,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    pub fn new(ticks_per_quarter: u16) -> Self {
        Self {
            ticks_per_quarter: ticks_per_quarter.max(1),
            changes: vec![TempoChange {
                tick: 0,
                time: 0,
                tempo: DEFAULT_TEMPO,
            }],
        }
    }

    /// Records a tempo change. Changes must arrive in tick order; a change at
    /// the same tick as the previous one replaces it.
    pub fn push(&mut self, tick: u64, tempo: u32) {
        let time = self.tick_to_time(tick);
        if let Some(last) = self.changes.last_mut() {
            if last.tick == tick {
                last.tempo = tempo;
                return;
            }
            if last.tick > tick {
                warn!("tempo change at tick {} arrived out of order", tick);
                return;
            }
        }
        self.changes.push(TempoChange { tick, time, tempo });
    }

    /// Microseconds at `tick`
    pub fn tick_to_time(&self, tick: u64) -> u64 {
        let index = self
            .changes
            .partition_point(|change| change.tick <= tick)
            .saturating_sub(1);
        let Some(change) = self.changes.get(index) else {
            return 0;
        };
        let elapsed = u128::from(tick.saturating_sub(change.tick)) * u128::from(change.tempo)
            / u128::from(self.ticks_per_quarter);
        change.time + elapsed as u64
    }

    /// Microseconds per quarter note at `tick`
    pub fn tempo_at(&self, tick: u64) -> u32 {
        let index = self
            .changes
            .partition_point(|change| change.tick <= tick)
            .saturating_sub(1);
        self.changes.get(index).map_or(DEFAULT_TEMPO, |c| c.tempo)
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    pub fn ticks_per_quarter(&self) -> u16 {
        self.ticks_per_quarter
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(480)
    }
}

/// Song loaded from an SMF, with a replay cursor
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    messages: Vec<MidiMessage>,
    long_messages: Vec<LongMessage>,
    position: usize,
    last_time: Option<u64>,
    loop_position: Option<usize>,
    format: u16,
    track_count: usize,
    division: Option<Division>,
    tempo_map: TempoMap,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a song. On failure a warning is logged, the sequencer is left
    /// empty and false is returned.
    pub fn load(&mut self, bytes: &[u8]) -> bool {
        self.clear();
        match self.build(bytes) {
            Ok(()) => {
                debug!(
                    "SEQ: {} tracks, {} messages, {} us, loop at {:?}",
                    self.track_count,
                    self.messages.len(),
                    self.get_total_time(),
                    self.loop_time()
                );
                true
            }
            Err(e) => {
                warn!("failed to load MIDI file: {:#}", e);
                self.clear();
                false
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Dispatches every message earlier than `time` that has not been sent
    /// yet. Moving backwards, or playing for the first time, resets the sink
    /// and starts over.
    pub fn play<S: OutputSink + ?Sized>(&mut self, time: u64, sink: &mut S) {
        if self.last_time.map_or(true, |last| time < last) {
            sink.reset();
            self.position = 0;
        }
        self.last_time = Some(time);

        while let Some(message) = self.messages.get(self.position) {
            if message.time >= time {
                break;
            }
            match message.data {
                MessageData::Short(packed) => sink.midi_message(message.port, packed),
                MessageData::Long(index) => match self.long_messages.get(index) {
                    Some(LongMessage::SysEx(data)) => sink.sysex_message(message.port, data),
                    Some(LongMessage::Meta { kind, data }) => sink.meta_event(*kind, data),
                    None => {}
                },
            }
            self.position += 1;
        }
    }

    /// Moves the cursor to the loop point, or to the start when the song has
    /// none. Returns the new position.
    pub fn rewind_to_loop(&mut self) -> usize {
        match self.loop_position {
            Some(position) => {
                self.position = position;
                self.last_time = self.messages.get(position).map(|m| m.time);
            }
            None => self.rewind(),
        }
        self.position
    }

    /// Moves the cursor to the start; the next play resets the sink
    pub fn rewind(&mut self) {
        self.position = 0;
        self.last_time = None;
    }

    /// Time of the last message, 0 for an empty song
    pub fn get_total_time(&self) -> u64 {
        self.messages.last().map_or(0, |m| m.time)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// True once every message has been dispatched
    pub fn is_finished(&self) -> bool {
        self.position >= self.messages.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Time of the next message to dispatch
    pub fn next_time(&self) -> Option<u64> {
        self.messages.get(self.position).map(|m| m.time)
    }

    pub fn loop_position(&self) -> Option<usize> {
        self.loop_position
    }

    pub fn loop_time(&self) -> Option<u64> {
        self.loop_position
            .and_then(|p| self.messages.get(p))
            .map(|m| m.time)
    }

    pub fn format(&self) -> u16 {
        self.format
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    pub fn division(&self) -> Option<Division> {
        self.division
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn messages(&self) -> &[MidiMessage] {
        &self.messages
    }

    pub fn long_messages(&self) -> &[LongMessage] {
        &self.long_messages
    }

    fn build(&mut self, bytes: &[u8]) -> Result<()> {
        let smf = smf::parse(bytes)?;
        if smf.tracks.is_empty() {
            bail!("file contains no tracks");
        }
        self.format = smf.format;
        self.track_count = smf.tracks.len();
        self.division = Some(smf.division);

        // times hold ticks until the tempo pass below
        for (track, events) in smf.tracks.into_iter().enumerate() {
            let mut port = 0;
            for event in events {
                let data = match event.kind {
                    EventKind::Short(packed) => MessageData::Short(packed),
                    EventKind::SysEx(data) => {
                        self.long_messages.push(LongMessage::SysEx(data));
                        MessageData::Long(self.long_messages.len() - 1)
                    }
                    EventKind::Meta { kind, data } => {
                        if kind == META_PORT {
                            if let Some(&p) = data.first() {
                                port = usize::from(p);
                            }
                        }
                        self.long_messages.push(LongMessage::Meta { kind, data });
                        MessageData::Long(self.long_messages.len() - 1)
                    }
                };
                self.messages.push(MidiMessage {
                    time: event.tick,
                    data,
                    port,
                    track,
                });
            }
        }

        // stable: equal times keep track order
        self.messages.sort_by_key(|m| m.time);

        match smf.division {
            Division::Smpte { .. } => {
                for message in self.messages.iter_mut() {
                    message.time = smf.division.smpte_time(message.time).unwrap_or(0);
                }
            }
            Division::TicksPerQuarter(ticks_per_quarter) => {
                self.tempo_map = TempoMap::new(ticks_per_quarter);
                for message in self.messages.iter_mut() {
                    let tick = message.time;
                    message.time = self.tempo_map.tick_to_time(tick);
                    if let MessageData::Long(index) = message.data {
                        if let Some(tempo) = self.long_messages.get(index).and_then(tempo_of) {
                            self.tempo_map.push(tick, tempo);
                        }
                    }
                }
            }
        }

        self.loop_position = self.messages.iter().position(|m| self.is_loop_marker(m));
        Ok(())
    }

    fn is_loop_marker(&self, message: &MidiMessage) -> bool {
        match message.data {
            MessageData::Short(packed) => {
                packed & 0xF0 == 0xB0 && ((packed >> 8) & 0x7F) as u8 == LOOP_CONTROLLER
            }
            MessageData::Long(index) => matches!(
                self.long_messages.get(index),
                Some(LongMessage::Meta { kind: META_MARKER, data })
                    if data.eq_ignore_ascii_case(LOOP_MARKER.as_bytes())
            ),
        }
    }
}

fn tempo_of(message: &LongMessage) -> Option<u32> {
    match message {
        LongMessage::Meta { kind: META_TEMPO, data } if data.len() >= 3 => {
            Some((u32::from(data[0]) << 16) | (u32::from(data[1]) << 8) | u32::from(data[2]))
        }
        _ => None,
    }
}
