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

//! Phase-accumulator sine oscillator with phase modulation input

use super::tables::{sine_table, SINE_TABLE_BITS, SINE_TABLE_SIZE};

/// Shift applied to a ±32767 modulation input to turn it into a phase
/// offset. Full scale is one whole cycle either way.
pub const MODULATION_SHIFT: u32 = 17;

/// Fractional bits of the vibrato input (1 << 24 doubles the step).
pub const VIBRATO_SHIFT: u32 = 24;

const INDEX_SHIFT: u32 = 32 - SINE_TABLE_BITS;

/// Sine oscillator reading the shared sine table
#[derive(Clone, Copy, Debug)]
pub struct SineWaveGenerator {
    table: &'static [i32; SINE_TABLE_SIZE],
    /// Phase accumulator (32-bit unsigned for wraparound)
    phase: u32,
    /// Phase increment per sample
    step: u32,
}

impl SineWaveGenerator {
    /// Creates a silent generator (zero step)
    pub fn new() -> Self {
        Self {
            table: sine_table(),
            phase: 0,
            step: 0,
        }
    }

    /// Creates a generator running at `cycle` periods per sample
    pub fn with_cycle(cycle: f32) -> Self {
        let mut osc = Self::new();
        osc.set_cycle(cycle);
        osc
    }

    /// Sets the frequency as periods per sample (frequency / sample rate).
    /// Values are clamped to Nyquist.
    pub fn set_cycle(&mut self, cycle: f32) {
        let cycle = cycle.clamp(0.0, 0.5) as f64;
        self.step = (cycle * 4294967296.0) as u32;
    }

    /// Current phase increment
    #[inline]
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Permanently shifts the phase by a modulation amount
    #[inline]
    pub fn add_modulation(&mut self, modulation: i32) {
        self.phase = self
            .phase
            .wrapping_add((modulation as u32) << MODULATION_SHIFT);
    }

    /// Returns the next sample without modulation
    #[inline]
    pub fn get_next(&mut self) -> i32 {
        let value = self.table[(self.phase >> INDEX_SHIFT) as usize];
        self.phase = self.phase.wrapping_add(self.step);
        value
    }

    /// Returns the next sample, offset in phase by `modulation`, then advances
    /// by the step scaled by `1 + vibrato / 2^24`.
    #[inline]
    pub fn get_next_with(&mut self, modulation: i32, vibrato: i32) -> i32 {
        let phase = self
            .phase
            .wrapping_add((modulation as u32) << MODULATION_SHIFT);
        let value = self.table[(phase >> INDEX_SHIFT) as usize];
        let bend = ((self.step as i64 * vibrato as i64) >> VIBRATO_SHIFT) as u32;
        self.phase = self.phase.wrapping_add(self.step).wrapping_add(bend);
        value
    }
}

impl Default for SineWaveGenerator {
    fn default() -> Self {
        Self::new()
    }
}
