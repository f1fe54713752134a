// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! Operator envelope generator
//!
//! The envelope works in two domains:
//! - the attack ramps a linear level up to the total level (TL)
//! - everything after the attack accumulates attenuation in 0.09375 dB
//!   steps, which is converted back to a linear level through the level table
//!
//! Levels are 15-bit (0..=32767). The attenuation accumulator is 16.16 fixed
//! point.

use super::tables::{attack_time, decay_steps_per_second, level_table, LEVEL_STEPS};

/// Attenuation steps per TL unit (0.75 dB)
const TL_STEPS: u32 = 8;
/// Attenuation steps per SL unit (3 dB)
const SL_STEPS: u32 = 32;

/// Attenuation at which a released envelope is cut short (72 dB).
const SOUNDOFF_THRESHOLD: u32 = 0x300 << 16;
/// Seconds for the sound-off segment to cover the whole level range
const SOUNDOFF_TIME: f32 = 0.01;

const ATTENUATION_END: u32 = (LEVEL_STEPS as u32) << 16;

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Linear ramp up to TL, key held
    Attack,
    /// Linear ramp up to TL, key already released
    AttackRelease,
    /// Falling to SL, key held
    Decay,
    /// Falling to SL, key already released
    DecayRelease,
    /// Falling at the sustain rate while the key is held
    Sustain,
    /// Falling at the release rate
    Release,
    /// Fast fade to silence
    SoundOff,
    /// Silent; the owning note can be dropped
    Finished,
}

/// Per-operator amplitude envelope
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    state: EnvelopeState,

    // Effective rates (0-63) and levels in attenuation steps
    ar: usize,
    dr: usize,
    sr: usize,
    rr: usize,
    tl: u32,
    sl: u32,

    // Per-sample increments
    f_ar: u32,
    f_dr: u32,
    f_sr: u32,
    f_rr: u32,
    f_ss: u32,
    /// Linear attack target, 16.16
    f_tl: u32,
    /// Attenuation where decay ends, 16.16
    f_sl: u32,

    /// Linear level during the attack, attenuation afterwards (16.16)
    current: u32,

    rate: f32,
    hold: f32,
    freeze: f32,
}

impl EnvelopeGenerator {
    /// Creates an envelope from effective rates (0-63), sustain level (0-15)
    /// and total level (0-127). The envelope starts in the attack stage.
    pub fn new(ar: usize, dr: usize, sr: usize, rr: usize, sl: u8, tl: u8) -> Self {
        let tl = u32::from(tl.min(127)) * TL_STEPS;
        let sl_steps = match sl.min(15) {
            // SL 15 jumps to 93 dB
            15 => 31 * SL_STEPS,
            sl => u32::from(sl) * SL_STEPS,
        };
        let sl = (tl + sl_steps).min(LEVEL_STEPS as u32);

        let mut env = Self {
            state: EnvelopeState::Attack,
            ar: ar.min(63),
            dr: dr.min(63),
            sr: sr.min(63),
            rr: rr.min(63),
            tl,
            sl,
            f_ar: 0,
            f_dr: 0,
            f_sr: 0,
            f_rr: 0,
            f_ss: 0,
            f_tl: (level_table()[tl as usize] as u32) << 16,
            f_sl: sl << 16,
            current: 0,
            rate: 44100.0,
            hold: 0.0,
            freeze: 0.0,
        };
        env.update_parameters();
        env
    }

    /// Sets the sample rate in Hz
    pub fn set_rate(&mut self, rate: f32) {
        if rate > 0.0 && rate != self.rate {
            self.rate = rate;
            self.update_parameters();
        }
    }

    /// Sets the damper/sostenuto hold amount (0.0 - 1.0). Held envelopes
    /// release at a rate blended towards the sustain rate.
    pub fn set_hold(&mut self, hold: f32) {
        let hold = hold.clamp(0.0, 1.0);
        if hold != self.hold {
            self.hold = hold;
            self.update_parameters();
        }
    }

    /// Sets the freeze amount (0.0 - 1.0). A fully frozen envelope stops
    /// decaying.
    pub fn set_freeze(&mut self, freeze: f32) {
        let freeze = freeze.clamp(0.0, 1.0);
        if freeze != self.freeze {
            self.freeze = freeze;
            self.update_parameters();
        }
    }

    /// Current stage
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// True once the envelope has faded out completely
    pub fn is_finished(&self) -> bool {
        self.state == EnvelopeState::Finished
    }

    /// Moves the envelope to the release branch of its current stage
    pub fn key_off(&mut self) {
        match self.state {
            EnvelopeState::Attack if self.f_ar == 0 => {
                // an attack that never progresses would never finish
                self.sound_off();
            }
            EnvelopeState::Attack => self.state = EnvelopeState::AttackRelease,
            EnvelopeState::Decay => self.state = EnvelopeState::DecayRelease,
            EnvelopeState::Sustain => self.state = EnvelopeState::Release,
            _ => {}
        }
    }

    /// Starts the fast fade to silence
    pub fn sound_off(&mut self) {
        match self.state {
            EnvelopeState::Attack | EnvelopeState::AttackRelease => {
                self.current = linear_to_attenuation((self.current >> 16) as i32) << 16;
                self.state = EnvelopeState::SoundOff;
            }
            EnvelopeState::Finished => {}
            _ => self.state = EnvelopeState::SoundOff,
        }
    }

    /// Returns the next envelope level (0..=32767)
    #[inline]
    pub fn get_next(&mut self) -> i32 {
        match self.state {
            EnvelopeState::Attack | EnvelopeState::AttackRelease => {
                let next = self.current.saturating_add(self.f_ar);
                if next < self.f_tl {
                    self.current = next;
                    (next >> 16) as i32
                } else {
                    self.state = if self.state == EnvelopeState::Attack {
                        EnvelopeState::Decay
                    } else {
                        EnvelopeState::DecayRelease
                    };
                    self.current = self.tl << 16;
                    (self.f_tl >> 16) as i32
                }
            }
            EnvelopeState::Decay | EnvelopeState::DecayRelease => {
                let step = if self.state == EnvelopeState::Decay {
                    self.f_dr
                } else {
                    self.f_dr.max(self.f_rr)
                };
                let next = self.current.saturating_add(step);
                if next < self.f_sl {
                    self.current = next;
                } else {
                    self.current = self.f_sl;
                    self.state = if self.state == EnvelopeState::Decay {
                        EnvelopeState::Sustain
                    } else {
                        EnvelopeState::Release
                    };
                }
                self.level()
            }
            EnvelopeState::Sustain => {
                self.current = self.current.saturating_add(self.f_sr).min(ATTENUATION_END);
                self.level()
            }
            EnvelopeState::Release => {
                self.current = self.current.saturating_add(self.f_rr).min(ATTENUATION_END);
                if self.current >= SOUNDOFF_THRESHOLD {
                    self.state = EnvelopeState::SoundOff;
                }
                self.level()
            }
            EnvelopeState::SoundOff => {
                self.current = self.current.saturating_add(self.f_ss);
                if self.current >= ATTENUATION_END {
                    self.current = ATTENUATION_END;
                    self.state = EnvelopeState::Finished;
                    0
                } else {
                    self.level()
                }
            }
            EnvelopeState::Finished => 0,
        }
    }

    /// Converts the attenuation accumulator to a linear level, interpolating
    /// between table entries.
    #[inline]
    fn level(&self) -> i32 {
        let index = (self.current >> 16) as usize;
        if index >= LEVEL_STEPS {
            return 0;
        }
        let table = level_table();
        let a = table[index];
        let b = table[index + 1];
        let frac = (self.current & 0xFFFF) as i64;
        a - (((a - b) as i64 * frac) >> 16) as i32
    }

    fn update_parameters(&mut self) {
        let rate = self.rate;
        let per_sample = |steps_per_second: f32| -> u32 {
            (steps_per_second * 65536.0 / rate).min(u32::MAX as f32) as u32
        };

        let attack = attack_time(self.ar);
        self.f_ar = if attack == 0.0 {
            u32::MAX
        } else if attack.is_infinite() {
            0
        } else {
            ((self.f_tl as f32 / (attack * rate)) as u32).max(1)
        };

        let thaw = 1.0 - self.freeze;
        let dr = decay_steps_per_second(self.dr);
        let sr = decay_steps_per_second(self.sr);
        let rr = decay_steps_per_second(self.rr);
        self.f_dr = per_sample(dr * thaw);
        self.f_sr = per_sample(sr * thaw);
        self.f_rr = per_sample((rr * (1.0 - self.hold) + sr * self.hold) * thaw);
        self.f_ss = per_sample(LEVEL_STEPS as f32 / SOUNDOFF_TIME);
    }
}

/// Attenuation step whose level is the closest not above `level`.
fn linear_to_attenuation(level: i32) -> u32 {
    if level <= 0 {
        return LEVEL_STEPS as u32;
    }
    level_table().partition_point(|&entry| entry > level) as u32
}
