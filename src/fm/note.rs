//! A sounding FM note

use super::patch::FmParameter;
use super::sound_generator::FmSoundGenerator;

/// Centre pan position
pub const PANPOT_CENTER: u16 = 8192;

/// One FM voice with its velocity and placement
#[derive(Clone, Debug)]
pub struct FmNote {
    generator: FmSoundGenerator,
    /// Q15 gain from the note-on velocity
    velocity: i32,
    assign: u32,
    panpot: u16,
}

impl FmNote {
    pub fn new(param: &FmParameter, key: u8, velocity: u8, assign: u32, panpot: u16) -> Self {
        Self {
            generator: FmSoundGenerator::new(param, key, 44100.0),
            velocity: (i32::from(velocity.min(127)) << 15) / 127,
            assign,
            panpot: panpot.min(16383),
        }
    }

    /// Renders `out.len() / 2` stereo frames and adds them to `out`.
    ///
    /// `left` and `right` are Q14 gains (16384 is unity).
    pub fn synthesize(&mut self, out: &mut [i32], rate: f32, left: i32, right: i32) {
        self.generator.set_rate(rate);
        for frame in out.chunks_exact_mut(2) {
            let sample = (i64::from(self.generator.get_next()) * i64::from(self.velocity)) >> 15;
            frame[0] += ((sample * i64::from(left)) >> 14) as i32;
            frame[1] += ((sample * i64::from(right)) >> 14) as i32;
        }
    }

    pub fn note_off(&mut self) {
        self.generator.key_off();
    }

    pub fn sound_off(&mut self) {
        self.generator.sound_off();
    }

    pub fn is_finished(&self) -> bool {
        self.generator.is_finished()
    }

    pub fn set_frequency_multiplier(&mut self, multiplier: f32) {
        self.generator.set_frequency_multiplier(multiplier);
    }

    pub fn set_tremolo(&mut self, depth: f32) {
        self.generator.set_tremolo(depth);
    }

    pub fn set_vibrato(&mut self, cents: f32) {
        self.generator.set_vibrato(cents);
    }

    pub fn set_damper(&mut self, value: u8) {
        self.generator.set_damper(value);
    }

    pub fn set_sostenuto(&mut self, value: u8) {
        self.generator.set_sostenuto(value);
    }

    pub fn set_freeze(&mut self, value: u8) {
        self.generator.set_freeze(value);
    }

    /// Exclusive group id, 0 for none
    pub fn assign_group(&self) -> u32 {
        self.assign
    }

    pub fn panpot(&self) -> u16 {
        self.panpot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::patch::FmOperatorParameter;

    fn sine() -> FmParameter {
        let carrier = FmOperatorParameter {
            ar: 31,
            rr: 10,
            ml: 1,
            ..Default::default()
        };
        let muted = FmOperatorParameter {
            tl: 127,
            ..carrier
        };
        FmParameter {
            alg: 7,
            fb: 7,
            lfo: 0,
            op: [carrier, muted, muted, muted],
        }
    }

    #[test]
    fn test_velocity_scales_output() {
        let mut loud = FmNote::new(&sine(), 69, 127, 0, PANPOT_CENTER);
        let mut soft = FmNote::new(&sine(), 69, 32, 0, PANPOT_CENTER);
        let mut a = vec![0i32; 400];
        let mut b = vec![0i32; 400];
        loud.synthesize(&mut a, 44100.0, 16384, 16384);
        soft.synthesize(&mut b, 44100.0, 16384, 16384);
        let peak = |buf: &[i32]| buf.iter().map(|s| s.abs()).max().unwrap_or(0);
        assert!(peak(&a) > 3 * peak(&b));
    }

    #[test]
    fn test_gains_place_the_note() {
        let mut note = FmNote::new(&sine(), 69, 127, 0, PANPOT_CENTER);
        let mut out = vec![0i32; 400];
        note.synthesize(&mut out, 44100.0, 16384, 0);
        assert!(out.chunks(2).all(|f| f[1] == 0));
        assert!(out.chunks(2).any(|f| f[0] != 0));
    }

    #[test]
    fn test_output_is_mixed_in() {
        let mut note = FmNote::new(&sine(), 69, 127, 0, PANPOT_CENTER);
        let mut out = vec![1000i32; 4];
        note.synthesize(&mut out, 44100.0, 0, 0);
        assert_eq!(out, vec![1000; 4]);
    }
}
