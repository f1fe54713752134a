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

//! Four-operator voice: routing, feedback and the per-note LFO

use super::algorithm::Algorithm;
use super::operator::FmOperator;
use super::patch::{FmParameter, NUM_OPERATORS};
use super::sine::{SineWaveGenerator, VIBRATO_SHIFT};
use super::tables::LFO_FREQUENCIES;

/// Feedback setting that disables the loop
const FEEDBACK_OFF: u8 = 7;
/// Largest tremolo dip, Q15 (half amplitude)
const MAX_TREMOLO: f32 = 16384.0;

/// The DSP core of one sounding note
#[derive(Clone, Debug)]
pub struct FmSoundGenerator {
    ops: [FmOperator; NUM_OPERATORS],
    algorithm: Algorithm,
    carriers: [bool; NUM_OPERATORS],
    feedback_shift: Option<u32>,
    feedback: [i32; 2],
    lfo: SineWaveGenerator,
    lfo_frequency: f32,
    rate: f32,
    /// LFO output is only computed when something listens to it
    ams_enabled: bool,
    /// Q24 step bend at the LFO peak
    vibrato: i32,
    /// Q15 dip at the LFO peak
    tremolo: i32,
    damper: f32,
    sostenuto: f32,
}

impl FmSoundGenerator {
    /// Builds a voice from a preset for `key` at `rate` Hz
    pub fn new(param: &FmParameter, key: u8, rate: f32) -> Self {
        let algorithm = Algorithm::from_index(param.alg);
        let mut generator = Self {
            ops: std::array::from_fn(|i| FmOperator::new(&param.op[i], key)),
            algorithm,
            carriers: algorithm.carriers(),
            feedback_shift: match param.fb & 7 {
                FEEDBACK_OFF => None,
                fb => Some(u32::from(fb) + 1),
            },
            feedback: [0; 2],
            lfo: SineWaveGenerator::new(),
            lfo_frequency: LFO_FREQUENCIES[usize::from(param.lfo & 7)],
            rate: 0.0,
            ams_enabled: param.op.iter().any(|op| op.ams != 0),
            vibrato: 0,
            tremolo: 0,
            damper: 0.0,
            sostenuto: 0.0,
        };
        generator.set_rate(rate);
        generator
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sets the sample rate in Hz
    pub fn set_rate(&mut self, rate: f32) {
        if rate > 0.0 && rate != self.rate {
            self.rate = rate;
            for op in self.ops.iter_mut() {
                op.set_rate(rate);
            }
            self.lfo.set_cycle(self.lfo_frequency / rate);
        }
    }

    /// Scales every operator's frequency (pitch bend, tuning)
    pub fn set_frequency_multiplier(&mut self, multiplier: f32) {
        for op in self.ops.iter_mut() {
            op.set_frequency_multiplier(multiplier);
        }
    }

    /// Sets the peak vibrato deviation in cents
    pub fn set_vibrato(&mut self, cents: f32) {
        let ratio = 2f32.powf(cents.max(0.0) / 1200.0) - 1.0;
        self.vibrato = (ratio * (1 << VIBRATO_SHIFT) as f32) as i32;
    }

    /// Sets the tremolo depth, 0.0 - 1.0 of the maximum dip
    pub fn set_tremolo(&mut self, depth: f32) {
        self.tremolo = (depth.clamp(0.0, 1.0) * MAX_TREMOLO) as i32;
    }

    /// Damper pedal value (0-127)
    pub fn set_damper(&mut self, value: u8) {
        self.damper = f32::from(value.min(127)) / 127.0;
        self.update_hold();
    }

    /// Sostenuto pedal value (0-127)
    pub fn set_sostenuto(&mut self, value: u8) {
        self.sostenuto = f32::from(value.min(127)) / 127.0;
        self.update_hold();
    }

    /// Freeze value (0-127)
    pub fn set_freeze(&mut self, value: u8) {
        let freeze = f32::from(value.min(127)) / 127.0;
        for op in self.ops.iter_mut() {
            op.set_freeze(freeze);
        }
    }

    pub fn key_off(&mut self) {
        for op in self.ops.iter_mut() {
            op.key_off();
        }
    }

    pub fn sound_off(&mut self) {
        for op in self.ops.iter_mut() {
            op.sound_off();
        }
    }

    /// True once every carrier has finished
    pub fn is_finished(&self) -> bool {
        self.ops
            .iter()
            .zip(self.carriers)
            .all(|(op, carrier)| !carrier || op.is_finished())
    }

    /// Renders one sample. The result is the sum of the carriers, each
    /// within ±32767.
    #[inline]
    pub fn get_next(&mut self) -> i32 {
        let lfo = if self.ams_enabled || self.vibrato != 0 || self.tremolo != 0 {
            self.lfo.get_next()
        } else {
            0
        };
        let vibrato = if self.vibrato != 0 {
            ((self.vibrato as i64 * lfo as i64) >> 15) as i32
        } else {
            0
        };

        let feedback = match self.feedback_shift {
            Some(shift) => (self.feedback[0] + self.feedback[1]) >> shift,
            None => 0,
        };
        let (out, o1) = self.algorithm.process(&mut self.ops, feedback, vibrato, lfo);
        self.feedback[1] = self.feedback[0];
        self.feedback[0] = o1;

        if self.tremolo != 0 {
            let dip = (self.tremolo * (lfo + 32768)) >> 16;
            ((out as i64 * (32768 - dip) as i64) >> 15) as i32
        } else {
            out
        }
    }

    fn update_hold(&mut self) {
        let hold = 1.0 - (1.0 - self.damper) * (1.0 - self.sostenuto);
        for op in self.ops.iter_mut() {
            op.set_hold(hold);
        }
    }
}
