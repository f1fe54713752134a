//! Synthesis-backend independent notes
//!
//! Channels only talk to [`Note`] and [`NoteFactory`]. Each backend adds a
//! variant; FM is the only one today.

use crate::fm::{FmNote, FmNoteFactory};

/// A sounding note owned by a channel
#[derive(Clone, Debug)]
pub enum Note {
    Fm(FmNote),
}

impl Note {
    /// Adds `out.len() / 2` stereo frames to `out` with Q14 gains
    pub fn synthesize(&mut self, out: &mut [i32], rate: f32, left: i32, right: i32) {
        match self {
            Note::Fm(note) => note.synthesize(out, rate, left, right),
        }
    }

    pub fn note_off(&mut self) {
        match self {
            Note::Fm(note) => note.note_off(),
        }
    }

    pub fn sound_off(&mut self) {
        match self {
            Note::Fm(note) => note.sound_off(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            Note::Fm(note) => note.is_finished(),
        }
    }

    pub fn set_frequency_multiplier(&mut self, multiplier: f32) {
        match self {
            Note::Fm(note) => note.set_frequency_multiplier(multiplier),
        }
    }

    /// Tremolo depth, 0.0 - 1.0
    pub fn set_tremolo(&mut self, depth: f32) {
        match self {
            Note::Fm(note) => note.set_tremolo(depth),
        }
    }

    /// Peak vibrato deviation in cents
    pub fn set_vibrato(&mut self, cents: f32) {
        match self {
            Note::Fm(note) => note.set_vibrato(cents),
        }
    }

    pub fn set_damper(&mut self, value: u8) {
        match self {
            Note::Fm(note) => note.set_damper(value),
        }
    }

    pub fn set_sostenuto(&mut self, value: u8) {
        match self {
            Note::Fm(note) => note.set_sostenuto(value),
        }
    }

    pub fn set_freeze(&mut self, value: u8) {
        match self {
            Note::Fm(note) => note.set_freeze(value),
        }
    }

    /// Exclusive group id, 0 for none
    pub fn assign_group(&self) -> u32 {
        match self {
            Note::Fm(note) => note.assign_group(),
        }
    }

    pub fn panpot(&self) -> u16 {
        match self {
            Note::Fm(note) => note.panpot(),
        }
    }
}

/// Creates notes for a channel
#[derive(Clone, Debug)]
pub enum NoteFactory {
    Fm(FmNoteFactory),
}

impl NoteFactory {
    /// Creates a note, or None when the program resolves to nothing
    pub fn note_on(
        &self,
        program: i32,
        key: u8,
        velocity: u8,
        frequency_multiplier: f32,
    ) -> Option<Note> {
        match self {
            NoteFactory::Fm(factory) => factory
                .note_on(program, key, velocity, frequency_multiplier)
                .map(Note::Fm),
        }
    }
}

impl Default for NoteFactory {
    fn default() -> Self {
        NoteFactory::Fm(FmNoteFactory::with_default_programs())
    }
}

impl From<FmNoteFactory> for NoteFactory {
    fn from(factory: FmNoteFactory) -> Self {
        NoteFactory::Fm(factory)
    }
}
