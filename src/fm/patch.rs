// Copyright 2021 Emilie Gillet.
// Rust port by Tyler Neely.
//
// Author: Emilie Gillet (emilie.o.gillet@gmail.com)
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

//! FM preset data structures
//!
//! A preset describes one four-operator voice. Field ranges follow the
//! OPN-family register layout; [`FmParameter::validate`] rejects anything
//! outside of them.

use anyhow::{ensure, Result};

/// Number of operators in a voice
pub const NUM_OPERATORS: usize = 4;

/// Per-operator parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FmOperatorParameter {
    /// Attack rate (0-31)
    pub ar: u8,
    /// Decay rate (0-31)
    pub dr: u8,
    /// Sustain rate (0-31)
    pub sr: u8,
    /// Release rate (0-15)
    pub rr: u8,
    /// Sustain level (0-15), 3 dB per step
    pub sl: u8,
    /// Total level (0-127), 0.75 dB per step
    pub tl: u8,
    /// Key scale (0-3)
    pub ks: u8,
    /// Frequency multiplier (0-15), 0 means one half
    pub ml: u8,
    /// Detune (0-7)
    pub dt: u8,
    /// Amplitude modulation sensitivity (0-3)
    pub ams: u8,
}

impl FmOperatorParameter {
    /// Checks every field against its register range
    pub fn validate(&self) -> Result<()> {
        check("AR", self.ar, 31)?;
        check("DR", self.dr, 31)?;
        check("SR", self.sr, 31)?;
        check("RR", self.rr, 15)?;
        check("SL", self.sl, 15)?;
        check("TL", self.tl, 127)?;
        check("KS", self.ks, 3)?;
        check("ML", self.ml, 15)?;
        check("DT", self.dt, 7)?;
        check("AMS", self.ams, 3)?;
        Ok(())
    }
}

/// A complete four-operator voice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FmParameter {
    /// Routing algorithm (0-7)
    pub alg: u8,
    /// Operator 1 self-feedback (0-7), 7 disables it
    pub fb: u8,
    /// LFO frequency index (0-7)
    pub lfo: u8,
    /// Operators 1-4
    pub op: [FmOperatorParameter; NUM_OPERATORS],
}

impl FmParameter {
    /// Checks every field against its register range
    pub fn validate(&self) -> Result<()> {
        check("ALG", self.alg, 7)?;
        check("FB", self.fb, 7)?;
        check("LFO", self.lfo, 7)?;
        for (i, op) in self.op.iter().enumerate() {
            op.validate()
                .map_err(|e| e.context(format!("operator {}", i + 1)))?;
        }
        Ok(())
    }
}

/// A percussion voice: a preset played at a fixed key and position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrumParameter {
    pub param: FmParameter,
    /// Key the voice is pitched at, whatever note triggered it (0-127)
    pub key: u8,
    /// Stereo position (0-16383, 8192 is centre)
    pub panpot: u16,
    /// Exclusive group; notes sharing a non-zero group choke each other
    pub assign: u32,
}

impl Default for DrumParameter {
    fn default() -> Self {
        Self {
            param: FmParameter::default(),
            key: 60,
            panpot: 8192,
            assign: 0,
        }
    }
}

impl DrumParameter {
    /// Checks the voice and the drum-specific fields
    pub fn validate(&self) -> Result<()> {
        self.param.validate()?;
        check("key", self.key, 127)?;
        ensure!(
            self.panpot <= 16383,
            "panpot out of range: {} (max 16383)",
            self.panpot
        );
        Ok(())
    }
}

fn check(name: &str, value: u8, max: u8) -> Result<()> {
    ensure!(value <= max, "{} out of range: {} (max {})", name, value, max);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(FmParameter::default().validate().is_ok());
        assert!(DrumParameter::default().validate().is_ok());
    }

    #[test]
    fn test_operator_ranges() {
        let mut op = FmOperatorParameter {
            ar: 31,
            dr: 31,
            sr: 31,
            rr: 15,
            sl: 15,
            tl: 127,
            ks: 3,
            ml: 15,
            dt: 7,
            ams: 3,
        };
        assert!(op.validate().is_ok());

        op.rr = 16;
        assert!(op.validate().is_err());
        op.rr = 15;
        op.tl = 128;
        assert!(op.validate().is_err());
    }

    #[test]
    fn test_error_names_operator() {
        let mut param = FmParameter::default();
        param.op[2].ks = 4;
        let err = param.validate().unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("operator 3"), "{}", message);
        assert!(message.contains("KS"), "{}", message);
    }

    #[test]
    fn test_drum_ranges() {
        let mut drum = DrumParameter::default();
        drum.key = 128;
        assert!(drum.validate().is_err());
        drum.key = 127;
        drum.panpot = 16384;
        assert!(drum.validate().is_err());
        drum.panpot = 16383;
        assert!(drum.validate().is_ok());
    }
}
