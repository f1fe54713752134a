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

//! FM operator: one oscillator shaped by one envelope

use super::envelope::{EnvelopeGenerator, EnvelopeState};
use super::patch::FmOperatorParameter;
use super::sine::SineWaveGenerator;
use super::tables::{ams_table, detune_table, key_frequency, keyscale_table};

/// Highest effective envelope rate
const MAX_RATE: usize = 63;

/// A single operator bound to the key it was struck at
#[derive(Clone, Debug)]
pub struct FmOperator {
    osc: SineWaveGenerator,
    env: EnvelopeGenerator,
    /// Oscillator frequency before pitch bend and tuning, Hz
    frequency: f32,
    frequency_multiplier: f32,
    rate: f32,
    /// Q15 depth of the LFO amplitude dip
    ams: i32,
}

impl FmOperator {
    /// Creates an operator for `key` (0-127). Fields are masked to their
    /// register ranges; presets are validated before they get here.
    pub fn new(param: &FmOperatorParameter, key: u8) -> Self {
        let key = usize::from(key & 0x7F);
        let ks = usize::from(keyscale_table()[usize::from(param.ks & 3)][key]);

        let scaled = |rate: u8| -> usize {
            if rate == 0 {
                0
            } else {
                (2 * usize::from(rate) + ks).min(MAX_RATE)
            }
        };
        let rr = (4 * usize::from(param.rr) + 2 + ks).min(MAX_RATE);

        let env = EnvelopeGenerator::new(
            scaled(param.ar),
            scaled(param.dr),
            scaled(param.sr),
            rr,
            param.sl,
            param.tl,
        );

        let multiple = match param.ml & 15 {
            0 => 0.5,
            ml => f32::from(ml),
        };
        let detune = detune_table()[usize::from(param.dt & 7)][key];
        let frequency = (key_frequency(key as i32) + detune).max(0.0) * multiple;

        let mut op = Self {
            osc: SineWaveGenerator::new(),
            env,
            frequency,
            frequency_multiplier: 1.0,
            rate: 44100.0,
            ams: ams_table()[usize::from(param.ams & 3)],
        };
        op.update_step();
        op
    }

    /// Sets the sample rate in Hz
    pub fn set_rate(&mut self, rate: f32) {
        if rate > 0.0 && rate != self.rate {
            self.rate = rate;
            self.env.set_rate(rate);
            self.update_step();
        }
    }

    /// Scales the oscillator frequency (pitch bend, tuning)
    pub fn set_frequency_multiplier(&mut self, multiplier: f32) {
        if multiplier != self.frequency_multiplier {
            self.frequency_multiplier = multiplier;
            self.update_step();
        }
    }

    /// Oscillator frequency in Hz, including the multiplier
    pub fn frequency(&self) -> f32 {
        self.frequency * self.frequency_multiplier
    }

    pub fn set_hold(&mut self, hold: f32) {
        self.env.set_hold(hold);
    }

    pub fn set_freeze(&mut self, freeze: f32) {
        self.env.set_freeze(freeze);
    }

    pub fn key_off(&mut self) {
        self.env.key_off();
    }

    pub fn sound_off(&mut self) {
        self.env.sound_off();
    }

    pub fn is_finished(&self) -> bool {
        self.env.is_finished()
    }

    pub fn envelope_state(&self) -> EnvelopeState {
        self.env.state()
    }

    /// Renders one sample.
    ///
    /// `modulation` is a phase offset (±32767 is one cycle), `vibrato` a Q24
    /// step bend and `lfo` the shared LFO output (±32767) that drives the
    /// amplitude modulation.
    #[inline]
    pub fn get_next(&mut self, modulation: i32, vibrato: i32, lfo: i32) -> i32 {
        let mut level = self.env.get_next();
        if self.ams != 0 {
            let dip = (self.ams * (lfo + 32768)) >> 16;
            level = (level * (32768 - dip)) >> 15;
        }
        let sample = self.osc.get_next_with(modulation, vibrato);
        (sample * level) >> 15
    }

    fn update_step(&mut self) {
        self.osc.set_cycle(self.frequency() / self.rate);
    }
}
