//! Preset library and note construction

use std::collections::BTreeMap;

use super::note::{FmNote, PANPOT_CENTER};
use super::patch::{DrumParameter, FmOperatorParameter, FmParameter};

/// Program used when nothing more specific resolves
pub const DEFAULT_PROGRAM: i32 = -1;

/// Bank class (program >> 14) reserved for percussion
pub const DRUM_BANK_CLASS: i32 = 120;

/// Maps program numbers and drum keys to presets.
///
/// Program numbers combine bank and program as `(bank << 7) | program`,
/// where bank is the 14-bit MSB/LSB pair. Drum presets are keyed by
/// `(program << 7) | note` or by the bare note.
#[derive(Clone, Debug)]
pub struct FmNoteFactory {
    programs: BTreeMap<i32, FmParameter>,
    drums: BTreeMap<i32, DrumParameter>,
}

impl FmNoteFactory {
    /// Creates a library holding only the default program
    pub fn new() -> Self {
        let mut factory = Self {
            programs: BTreeMap::new(),
            drums: BTreeMap::new(),
        };
        factory.programs.insert(DEFAULT_PROGRAM, default_program());
        factory
    }

    /// Creates a library with the built-in melodic bank and drum map
    pub fn with_default_programs() -> Self {
        let mut factory = Self::new();
        super::programs::install(&mut factory);
        factory
    }

    /// Removes every preset, including the default program
    pub fn clear(&mut self) {
        self.programs.clear();
        self.drums.clear();
    }

    /// Installs a melodic preset. Returns false and keeps the previous
    /// mapping if any field is out of range.
    pub fn set_program(&mut self, number: i32, param: FmParameter) -> bool {
        match param.validate() {
            Ok(()) => {
                self.programs.insert(number, param);
                true
            }
            Err(e) => {
                log::warn!("rejected program {}: {:#}", number, e);
                false
            }
        }
    }

    /// Installs a percussion preset. Returns false and keeps the previous
    /// mapping if any field is out of range.
    pub fn set_drum_program(&mut self, number: i32, param: DrumParameter) -> bool {
        match param.validate() {
            Ok(()) => {
                self.drums.insert(number, param);
                true
            }
            Err(e) => {
                log::warn!("rejected drum program {}: {:#}", number, e);
                false
            }
        }
    }

    pub fn program(&self, number: i32) -> Option<&FmParameter> {
        self.programs.get(&number)
    }

    pub fn drum_program(&self, number: i32) -> Option<&DrumParameter> {
        self.drums.get(&number)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn drum_program_count(&self) -> usize {
        self.drums.len()
    }

    /// True if `program` addresses the percussion bank
    pub fn is_drum(program: i32) -> bool {
        program >> 14 == DRUM_BANK_CLASS
    }

    /// Creates a note for `program` and `key`, or None if no preset
    /// resolves. The preset is copied into the note.
    pub fn note_on(
        &self,
        program: i32,
        key: u8,
        velocity: u8,
        frequency_multiplier: f32,
    ) -> Option<FmNote> {
        let mut note = if Self::is_drum(program) {
            match self.find_drum(program, key) {
                Some(drum) => FmNote::new(
                    &drum.param,
                    drum.key,
                    velocity,
                    drum.assign,
                    drum.panpot,
                ),
                None => {
                    let param = self.programs.get(&DEFAULT_PROGRAM)?;
                    FmNote::new(param, key, velocity, 0, PANPOT_CENTER)
                }
            }
        } else {
            let param = self.find_program(program)?;
            FmNote::new(param, key, velocity, 0, PANPOT_CENTER)
        };
        note.set_frequency_multiplier(frequency_multiplier);
        Some(note)
    }

    fn find_program(&self, program: i32) -> Option<&FmParameter> {
        self.programs
            .get(&program)
            .or_else(|| self.programs.get(&(program & 0x7F)))
            .or_else(|| self.programs.get(&DEFAULT_PROGRAM))
    }

    fn find_drum(&self, program: i32, key: u8) -> Option<&DrumParameter> {
        let key = i32::from(key & 0x7F);
        self.drums
            .get(&((program << 7) | key))
            .or_else(|| self.drums.get(&key))
    }
}

impl Default for FmNoteFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// A short plain sine
fn default_program() -> FmParameter {
    let carrier = FmOperatorParameter {
        ar: 31,
        dr: 0,
        sr: 0,
        rr: 12,
        sl: 0,
        tl: 0,
        ks: 0,
        ml: 1,
        dt: 0,
        ams: 0,
    };
    let muted = FmOperatorParameter { tl: 127, ..carrier };
    FmParameter {
        alg: 7,
        fb: 7,
        lfo: 0,
        op: [carrier, muted, muted, muted],
    }
}
