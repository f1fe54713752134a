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

//! The eight four-operator routing topologies
//!
//! ```text
//! ALG0: 1 > 2 > 3 > 4           ALG4: (1 > 2) + (3 > 4)
//! ALG1: (1 + 2) > 3 > 4         ALG5: 1 > (2 + 3 + 4)
//! ALG2: (1 + (2 > 3)) > 4       ALG6: (1 > 2) + 3 + 4
//! ALG3: ((1 > 2) + 3) > 4       ALG7: 1 + 2 + 3 + 4
//! ```
//!
//! Operator 1 always carries the self-feedback loop.

use super::operator::FmOperator;
use super::patch::NUM_OPERATORS;

/// Operator routing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Alg0,
    Alg1,
    Alg2,
    Alg3,
    Alg4,
    Alg5,
    Alg6,
    Alg7,
}

impl Algorithm {
    /// Maps a preset ALG value, using its low three bits
    pub fn from_index(index: u8) -> Self {
        match index & 7 {
            0 => Algorithm::Alg0,
            1 => Algorithm::Alg1,
            2 => Algorithm::Alg2,
            3 => Algorithm::Alg3,
            4 => Algorithm::Alg4,
            5 => Algorithm::Alg5,
            6 => Algorithm::Alg6,
            _ => Algorithm::Alg7,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Operators whose output reaches the mix rather than modulating
    /// another operator
    pub fn carriers(self) -> [bool; NUM_OPERATORS] {
        match self {
            Algorithm::Alg0 | Algorithm::Alg1 | Algorithm::Alg2 | Algorithm::Alg3 => {
                [false, false, false, true]
            }
            Algorithm::Alg4 => [false, true, false, true],
            Algorithm::Alg5 | Algorithm::Alg6 => [false, true, true, true],
            Algorithm::Alg7 => [true, true, true, true],
        }
    }

    /// Renders one sample through the routing.
    ///
    /// Returns the mixed carrier output and operator 1's output, which the
    /// caller feeds back on the next sample.
    #[inline]
    pub fn process(
        self,
        ops: &mut [FmOperator; NUM_OPERATORS],
        feedback: i32,
        vibrato: i32,
        lfo: i32,
    ) -> (i32, i32) {
        let [op1, op2, op3, op4] = ops;
        let o1 = op1.get_next(feedback, vibrato, lfo);
        let out = match self {
            Algorithm::Alg0 => {
                let o2 = op2.get_next(o1, vibrato, lfo);
                let o3 = op3.get_next(o2, vibrato, lfo);
                op4.get_next(o3, vibrato, lfo)
            }
            Algorithm::Alg1 => {
                let o2 = op2.get_next(0, vibrato, lfo);
                let o3 = op3.get_next(o1 + o2, vibrato, lfo);
                op4.get_next(o3, vibrato, lfo)
            }
            Algorithm::Alg2 => {
                let o2 = op2.get_next(0, vibrato, lfo);
                let o3 = op3.get_next(o2, vibrato, lfo);
                op4.get_next(o3 + o1, vibrato, lfo)
            }
            Algorithm::Alg3 => {
                let o2 = op2.get_next(o1, vibrato, lfo);
                let o3 = op3.get_next(0, vibrato, lfo);
                op4.get_next(o3 + o2, vibrato, lfo)
            }
            Algorithm::Alg4 => {
                let o2 = op2.get_next(o1, vibrato, lfo);
                let o3 = op3.get_next(0, vibrato, lfo);
                op4.get_next(o3, vibrato, lfo) + o2
            }
            Algorithm::Alg5 => {
                op2.get_next(o1, vibrato, lfo)
                    + op3.get_next(o1, vibrato, lfo)
                    + op4.get_next(o1, vibrato, lfo)
            }
            Algorithm::Alg6 => {
                let o2 = op2.get_next(o1, vibrato, lfo);
                o2 + op3.get_next(0, vibrato, lfo) + op4.get_next(0, vibrato, lfo)
            }
            Algorithm::Alg7 => {
                o1 + op2.get_next(0, vibrato, lfo)
                    + op3.get_next(0, vibrato, lfo)
                    + op4.get_next(0, vibrato, lfo)
            }
        };
        (out, o1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::patch::FmOperatorParameter;

    fn operators(tl: [u8; NUM_OPERATORS]) -> [FmOperator; NUM_OPERATORS] {
        std::array::from_fn(|i| {
            let param = FmOperatorParameter {
                ar: 31,
                rr: 8,
                tl: tl[i],
                ml: (i + 1) as u8,
                ..Default::default()
            };
            FmOperator::new(&param, 69)
        })
    }

    #[test]
    fn test_index_round_trip() {
        for i in 0..8u8 {
            assert_eq!(Algorithm::from_index(i).index(), i);
        }
        assert_eq!(Algorithm::from_index(15), Algorithm::Alg7);
    }

    #[test]
    fn test_every_algorithm_has_carrier_four() {
        for i in 0..8 {
            assert!(Algorithm::from_index(i).carriers()[3]);
        }
        assert_eq!(Algorithm::Alg7.carriers(), [true; 4]);
    }

    #[test]
    fn test_modulator_only_output_is_silent() {
        // with operators 2-4 muted, only ALG7 lets operator 1 through
        for i in 0..8 {
            let alg = Algorithm::from_index(i);
            let mut ops = operators([0, 127, 127, 127]);
            let mut heard = false;
            for _ in 0..500 {
                let (out, o1) = alg.process(&mut ops, 0, 0, 0);
                if alg == Algorithm::Alg7 {
                    assert_eq!(out, o1);
                } else {
                    assert_eq!(out, 0, "ALG{} leaked operator 1", i);
                }
                heard |= o1 != 0;
            }
            assert!(heard);
        }
    }
}
