//! Built-in preset bank
//!
//! Sixteen instrument families in General MIDI order, eight programs each.
//! The first program of a family is the family template; the others vary
//! its modulator levels and carrier detune. Percussion follows the GM key
//! map for keys 35-81.

use super::factory::FmNoteFactory;
use super::patch::{DrumParameter, FmOperatorParameter, FmParameter};

/// Operator parameters in register order: AR DR SR RR SL TL KS ML DT AMS
const fn op(p: [u8; 10]) -> FmOperatorParameter {
    FmOperatorParameter {
        ar: p[0],
        dr: p[1],
        sr: p[2],
        rr: p[3],
        sl: p[4],
        tl: p[5],
        ks: p[6],
        ml: p[7],
        dt: p[8],
        ams: p[9],
    }
}

const fn voice(alg: u8, fb: u8, lfo: u8, ops: [[u8; 10]; 4]) -> FmParameter {
    FmParameter {
        alg,
        fb,
        lfo,
        op: [op(ops[0]), op(ops[1]), op(ops[2]), op(ops[3])],
    }
}

#[rustfmt::skip]
const FAMILIES: [FmParameter; 16] = [
    // piano: four harmonics mixed additively
    voice(7, 7, 0, [
        [31, 4, 2, 6, 4, 0, 1, 1, 0, 0],
        [31, 6, 3, 6, 5, 24, 1, 2, 0, 0],
        [31, 8, 4, 6, 6, 32, 1, 3, 0, 0],
        [31, 10, 5, 6, 7, 40, 1, 4, 0, 0],
    ]),
    // chromatic percussion
    voice(4, 6, 0, [
        [31, 12, 4, 6, 6, 30, 2, 7, 0, 0],
        [31, 6, 2, 5, 4, 0, 1, 1, 0, 0],
        [31, 14, 6, 6, 8, 36, 2, 14, 0, 0],
        [31, 5, 2, 5, 4, 6, 1, 4, 0, 0],
    ]),
    // organ
    voice(7, 7, 2, [
        [31, 0, 0, 9, 0, 4, 0, 1, 0, 1],
        [31, 0, 0, 9, 0, 10, 0, 2, 0, 1],
        [31, 0, 0, 9, 0, 16, 0, 4, 0, 1],
        [31, 0, 0, 9, 0, 22, 0, 0, 0, 1],
    ]),
    // guitar
    voice(2, 5, 0, [
        [31, 12, 6, 7, 6, 34, 2, 3, 0, 0],
        [31, 14, 6, 7, 7, 40, 2, 1, 3, 0],
        [31, 10, 5, 7, 5, 30, 2, 1, 0, 0],
        [31, 7, 3, 7, 4, 0, 1, 1, 0, 0],
    ]),
    // bass
    voice(0, 4, 0, [
        [31, 14, 6, 8, 6, 40, 1, 1, 0, 0],
        [31, 12, 5, 8, 5, 36, 1, 1, 0, 0],
        [31, 10, 4, 8, 4, 28, 1, 1, 0, 0],
        [31, 6, 2, 8, 3, 0, 0, 1, 0, 0],
    ]),
    // strings
    voice(1, 6, 3, [
        [18, 4, 1, 6, 2, 36, 0, 1, 1, 0],
        [18, 4, 1, 6, 2, 38, 0, 1, 5, 0],
        [20, 4, 1, 6, 2, 30, 0, 1, 0, 0],
        [16, 2, 1, 5, 1, 0, 0, 1, 0, 0],
    ]),
    // ensemble
    voice(5, 6, 3, [
        [20, 4, 1, 6, 2, 34, 0, 1, 0, 0],
        [17, 2, 1, 5, 1, 4, 0, 1, 2, 0],
        [17, 2, 1, 5, 1, 4, 0, 1, 6, 0],
        [17, 2, 1, 5, 1, 4, 0, 2, 0, 0],
    ]),
    // brass
    voice(3, 3, 3, [
        [22, 8, 2, 7, 3, 30, 1, 1, 0, 0],
        [24, 6, 2, 7, 3, 28, 1, 1, 0, 0],
        [24, 8, 3, 7, 4, 44, 1, 1, 1, 0],
        [20, 4, 1, 7, 2, 0, 1, 1, 0, 0],
    ]),
    // reed
    voice(3, 4, 4, [
        [26, 6, 2, 8, 3, 32, 1, 3, 0, 0],
        [26, 6, 2, 8, 3, 30, 1, 1, 0, 0],
        [26, 8, 2, 8, 4, 42, 1, 2, 0, 0],
        [24, 4, 1, 8, 2, 0, 1, 1, 0, 0],
    ]),
    // pipe
    voice(6, 7, 4, [
        [24, 8, 2, 8, 4, 46, 0, 1, 0, 0],
        [22, 2, 1, 8, 1, 2, 0, 1, 0, 0],
        [22, 2, 1, 8, 1, 30, 0, 2, 0, 0],
        [22, 2, 1, 8, 1, 36, 0, 3, 0, 0],
    ]),
    // synth lead
    voice(4, 0, 5, [
        [31, 2, 1, 9, 1, 24, 1, 1, 0, 0],
        [31, 2, 1, 9, 1, 4, 1, 1, 0, 0],
        [31, 2, 1, 9, 1, 28, 1, 1, 3, 0],
        [31, 2, 1, 9, 1, 8, 1, 1, 7, 0],
    ]),
    // synth pad
    voice(5, 5, 1, [
        [14, 2, 1, 4, 2, 36, 0, 1, 0, 2],
        [12, 1, 0, 4, 1, 6, 0, 1, 1, 1],
        [12, 1, 0, 4, 1, 6, 0, 2, 5, 1],
        [12, 1, 0, 4, 1, 8, 0, 1, 3, 1],
    ]),
    // synth effects
    voice(2, 2, 6, [
        [16, 3, 1, 5, 2, 38, 0, 5, 0, 3],
        [20, 4, 1, 5, 2, 34, 0, 3, 0, 0],
        [18, 3, 1, 5, 2, 30, 0, 1, 0, 0],
        [16, 2, 1, 5, 2, 2, 0, 1, 0, 2],
    ]),
    // ethnic
    voice(4, 5, 0, [
        [31, 12, 5, 7, 6, 32, 2, 5, 0, 0],
        [31, 8, 3, 7, 5, 2, 1, 1, 0, 0],
        [31, 12, 6, 7, 7, 36, 2, 3, 2, 0],
        [31, 9, 4, 7, 5, 8, 1, 2, 0, 0],
    ]),
    // percussive
    voice(0, 4, 0, [
        [31, 18, 8, 8, 10, 36, 2, 9, 0, 0],
        [31, 16, 8, 8, 9, 34, 2, 3, 0, 0],
        [31, 14, 7, 8, 8, 30, 2, 1, 0, 0],
        [31, 12, 6, 8, 7, 0, 2, 1, 0, 0],
    ]),
    // sound effects
    voice(0, 0, 7, [
        [28, 2, 1, 6, 2, 20, 0, 15, 0, 3],
        [24, 3, 1, 6, 2, 26, 0, 7, 3, 0],
        [24, 3, 1, 6, 2, 24, 0, 11, 0, 0],
        [22, 2, 1, 6, 2, 4, 0, 1, 0, 3],
    ]),
];

/// Derives program `variant` (0-7) of a family
fn variation(template: &FmParameter, variant: u8) -> FmParameter {
    let mut param = *template;
    if variant == 0 {
        return param;
    }
    let carriers = super::algorithm::Algorithm::from_index(param.alg).carriers();
    for (op, carrier) in param.op.iter_mut().zip(carriers) {
        if carrier {
            op.dt = (op.dt + variant) & 7;
        } else {
            // odd variants brighten, even ones darken
            op.tl = if variant & 1 == 1 {
                op.tl.saturating_sub(2 * variant)
            } else {
                (op.tl + 2 * variant).min(127)
            };
        }
    }
    param.fb = if param.fb == 7 { 7 } else { (param.fb + variant / 2).min(6) };
    param
}

#[rustfmt::skip]
const DRUM_VOICES: [FmParameter; 8] = [
    // kick
    voice(0, 3, 0, [
        [31, 22, 0, 15, 15, 40, 0, 1, 0, 0],
        [31, 20, 0, 15, 15, 127, 0, 1, 0, 0],
        [31, 20, 0, 15, 15, 127, 0, 1, 0, 0],
        [31, 16, 10, 12, 8, 0, 0, 1, 0, 0],
    ]),
    // snare
    voice(7, 0, 0, [
        [31, 20, 12, 13, 10, 6, 0, 15, 0, 0],
        [31, 18, 10, 12, 8, 8, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
    ]),
    // tom
    voice(4, 4, 0, [
        [31, 22, 0, 15, 15, 44, 0, 1, 0, 0],
        [31, 15, 8, 11, 8, 0, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
    ]),
    // closed hat
    voice(7, 0, 0, [
        [31, 24, 18, 15, 12, 10, 0, 15, 3, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
    ]),
    // open hat and cymbals
    voice(7, 0, 0, [
        [31, 8, 6, 8, 6, 10, 0, 15, 3, 0],
        [31, 8, 6, 8, 6, 18, 0, 13, 5, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
    ]),
    // bell
    voice(4, 7, 0, [
        [31, 10, 6, 8, 6, 28, 0, 7, 0, 0],
        [31, 10, 6, 8, 6, 6, 0, 1, 0, 0],
        [31, 12, 8, 8, 8, 34, 0, 11, 0, 0],
        [31, 10, 6, 8, 6, 10, 0, 3, 0, 0],
    ]),
    // wood
    voice(0, 7, 0, [
        [31, 26, 20, 15, 15, 127, 0, 1, 0, 0],
        [31, 26, 20, 15, 15, 127, 0, 1, 0, 0],
        [31, 24, 18, 15, 12, 32, 0, 3, 0, 0],
        [31, 22, 16, 14, 12, 4, 0, 1, 0, 0],
    ]),
    // shaker
    voice(7, 0, 0, [
        [26, 20, 16, 14, 12, 14, 0, 15, 7, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
        [31, 20, 12, 13, 10, 127, 0, 1, 0, 0],
    ]),
];

const KICK: usize = 0;
const SNARE: usize = 1;
const TOM: usize = 2;
const CLOSED_HAT: usize = 3;
const CYMBAL: usize = 4;
const BELL: usize = 5;
const WOOD: usize = 6;
const SHAKER: usize = 7;

/// (note, voice, pitch key, panpot, assign group)
#[rustfmt::skip]
const DRUM_MAP: [(u8, usize, u8, u16, u32); 47] = [
    (35, KICK, 28, 8192, 0),
    (36, KICK, 31, 8192, 0),
    (37, WOOD, 72, 8192, 0),
    (38, SNARE, 52, 8192, 0),
    (39, SNARE, 64, 6144, 0),
    (40, SNARE, 55, 8192, 0),
    (41, TOM, 41, 4096, 0),
    (42, CLOSED_HAT, 90, 10240, 1),
    (43, TOM, 44, 5120, 0),
    (44, CLOSED_HAT, 86, 10240, 1),
    (45, TOM, 47, 6144, 0),
    (46, CYMBAL, 90, 10240, 1),
    (47, TOM, 50, 7168, 0),
    (48, TOM, 53, 9216, 0),
    (49, CYMBAL, 84, 6144, 0),
    (50, TOM, 56, 10240, 0),
    (51, CYMBAL, 96, 11264, 0),
    (52, CYMBAL, 80, 5120, 0),
    (53, BELL, 96, 11264, 0),
    (54, SHAKER, 100, 9216, 0),
    (55, CYMBAL, 92, 7168, 0),
    (56, BELL, 79, 9216, 0),
    (57, CYMBAL, 86, 10240, 0),
    (58, WOOD, 60, 4096, 0),
    (59, CYMBAL, 94, 11264, 0),
    (60, WOOD, 77, 11264, 0),
    (61, WOOD, 72, 11264, 0),
    (62, TOM, 64, 5120, 0),
    (63, TOM, 67, 5120, 0),
    (64, TOM, 60, 5120, 0),
    (65, TOM, 62, 10240, 0),
    (66, TOM, 57, 10240, 0),
    (67, BELL, 91, 3072, 0),
    (68, BELL, 86, 3072, 0),
    (69, SHAKER, 96, 4096, 0),
    (70, SHAKER, 104, 12288, 0),
    (71, BELL, 100, 13312, 2),
    (72, BELL, 96, 13312, 2),
    (73, WOOD, 84, 4096, 3),
    (74, WOOD, 79, 4096, 3),
    (75, WOOD, 96, 12288, 0),
    (76, WOOD, 86, 12288, 0),
    (77, WOOD, 81, 12288, 0),
    (78, BELL, 70, 4096, 4),
    (79, BELL, 65, 4096, 4),
    (80, BELL, 108, 3072, 5),
    (81, CYMBAL, 108, 3072, 5),
];

/// Loads the bank into `factory` through its validating setters
pub fn install(factory: &mut FmNoteFactory) {
    for (family, template) in FAMILIES.iter().enumerate() {
        for variant in 0..8u8 {
            let program = (family * 8) as i32 + i32::from(variant);
            factory.set_program(program, variation(template, variant));
        }
    }
    for &(note, voice, key, panpot, assign) in DRUM_MAP.iter() {
        let drum = DrumParameter {
            param: DRUM_VOICES[voice],
            key,
            panpot,
            assign,
        };
        factory.set_drum_program(i32::from(note), drum);
    }
    log::debug!(
        "installed {} programs and {} drum keys",
        factory.program_count(),
        factory.drum_program_count()
    );
}
