//! Lookup tables shared by every FM voice.
//!
//! All tables are built lazily on first use and are never mutated afterwards,
//! so they can be read from any thread without locking.

use std::sync::OnceLock;

/// log2 of the number of entries in the sine table
pub const SINE_TABLE_BITS: u32 = 12;
/// Number of entries in the sine table
pub const SINE_TABLE_SIZE: usize = 1 << SINE_TABLE_BITS;
/// Peak amplitude of the sine table (15-bit)
pub const SINE_AMPLITUDE: i32 = 32767;

/// Number of attenuation steps in the level table (96 dB)
pub const LEVEL_STEPS: usize = 1024;
/// Attenuation per step of the level table, in dB
pub const LEVEL_STEP_DB: f64 = 0.09375;
/// Level of an unattenuated envelope (15-bit)
pub const LEVEL_MAX: i32 = 32767;

/// Number of distinct envelope rates (6-bit effective rate)
pub const ENVELOPE_RATES: usize = 64;

/// Full-range traverse time of the slowest moving rate, in seconds.
const ENVELOPE_TIME_BASE: f64 = 120.0;
/// Attacks run this many times faster than decays of the same rate.
const ATTACK_SPEEDUP: f32 = 15.0;
/// Effective rates at or above this value attack instantly.
const INSTANT_ATTACK_RATE: usize = 62;

/// Hz per unit of the detune table.
const DETUNE_UNIT_HZ: f32 = 0.0529;

#[rustfmt::skip]
const DETUNE_KEYCODE: [[u8; 32]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7, 8, 8, 8, 8],
    [1, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7, 8, 8, 9, 10, 11, 12, 13, 14, 16, 16, 16, 16],
    [2, 2, 2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 6, 6, 7, 8, 8, 9, 10, 11, 12, 13, 14, 16, 17, 19, 20, 22, 22, 22, 22],
];

/// Tremolo depth selected by AMS, in dB
const AMS_DEPTH_DB: [f64; 4] = [0.0, 1.4, 5.9, 11.8];

/// LFO frequency selected by the preset's LFO index, in Hz
pub const LFO_FREQUENCIES: [f32; 8] = [3.98, 5.56, 6.02, 6.37, 6.88, 9.63, 48.1, 72.2];

static SINE_TABLE: OnceLock<[i32; SINE_TABLE_SIZE]> = OnceLock::new();
static LEVEL_TABLE: OnceLock<[i32; LEVEL_STEPS + 1]> = OnceLock::new();
static ENVELOPE_TIME_TABLE: OnceLock<[f32; ENVELOPE_RATES]> = OnceLock::new();
static KEYSCALE_TABLE: OnceLock<[[u8; 128]; 4]> = OnceLock::new();
static DETUNE_TABLE: OnceLock<[[f32; 128]; 8]> = OnceLock::new();
static AMS_TABLE: OnceLock<[i32; 4]> = OnceLock::new();

/// One full sine cycle, ±[`SINE_AMPLITUDE`].
pub fn sine_table() -> &'static [i32; SINE_TABLE_SIZE] {
    SINE_TABLE.get_or_init(|| {
        let mut table = [0i32; SINE_TABLE_SIZE];
        for (i, value) in table.iter_mut().enumerate() {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / SINE_TABLE_SIZE as f64;
            *value = (phase.sin() * SINE_AMPLITUDE as f64).round() as i32;
        }
        table
    })
}

/// Linear level for each attenuation step. The trailing entry is silence.
///
/// Entries are truncated rather than rounded, so the deepest attenuations
/// reach exactly zero.
pub fn level_table() -> &'static [i32; LEVEL_STEPS + 1] {
    LEVEL_TABLE.get_or_init(|| {
        let mut table = [0i32; LEVEL_STEPS + 1];
        for (i, value) in table.iter_mut().take(LEVEL_STEPS).enumerate() {
            let db = i as f64 * LEVEL_STEP_DB;
            *value = (LEVEL_MAX as f64 * 10f64.powf(-db / 20.0)) as i32;
        }
        table
    })
}

/// Seconds needed to traverse the whole level range at each effective rate.
///
/// Rates 0 and 1 never move.
pub fn envelope_time_table() -> &'static [f32; ENVELOPE_RATES] {
    ENVELOPE_TIME_TABLE.get_or_init(|| {
        let mut table = [f32::INFINITY; ENVELOPE_RATES];
        for (rate, value) in table.iter_mut().enumerate().skip(2) {
            *value = (ENVELOPE_TIME_BASE * 0.5f64.powf((rate - 2) as f64 / 4.0)) as f32;
        }
        table
    })
}

/// Attack time in seconds for an effective rate. Zero means instantaneous,
/// infinity means the attack never progresses.
pub fn attack_time(rate: usize) -> f32 {
    let rate = rate.min(ENVELOPE_RATES - 1);
    if rate >= INSTANT_ATTACK_RATE {
        0.0
    } else {
        envelope_time_table()[rate] / ATTACK_SPEEDUP
    }
}

/// Attenuation steps per second for decay-type segments at an effective rate.
pub fn decay_steps_per_second(rate: usize) -> f32 {
    let time = envelope_time_table()[rate.min(ENVELOPE_RATES - 1)];
    if time.is_finite() {
        LEVEL_STEPS as f32 / time
    } else {
        0.0
    }
}

/// Rate offset added for each key, one row per KS setting.
pub fn keyscale_table() -> &'static [[u8; 128]; 4] {
    KEYSCALE_TABLE.get_or_init(|| {
        let mut table = [[0u8; 128]; 4];
        for (ks, row) in table.iter_mut().enumerate() {
            for (key, value) in row.iter_mut().enumerate() {
                *value = (key / 4).min(31) as u8 >> (3 - ks);
            }
        }
        table
    })
}

/// Detune offset in Hz for each DT setting and key. DT 4-7 mirror 0-3
/// with the opposite sign.
pub fn detune_table() -> &'static [[f32; 128]; 8] {
    DETUNE_TABLE.get_or_init(|| {
        let mut table = [[0f32; 128]; 8];
        for (dt, row) in table.iter_mut().enumerate() {
            let sign = if dt < 4 { 1.0 } else { -1.0 };
            for (key, value) in row.iter_mut().enumerate() {
                let keycode = (key / 4).min(31);
                *value = sign * DETUNE_KEYCODE[dt & 3][keycode] as f32 * DETUNE_UNIT_HZ;
            }
        }
        table
    })
}

/// Amplitude-modulation depth for each AMS setting, as a Q15 fraction of full
/// scale removed at the LFO's peak.
pub fn ams_table() -> &'static [i32; 4] {
    AMS_TABLE.get_or_init(|| {
        let mut table = [0i32; 4];
        for (value, db) in table.iter_mut().zip(AMS_DEPTH_DB) {
            *value = ((1.0 - 10f64.powf(-db / 20.0)) * 32768.0).round() as i32;
        }
        table
    })
}

/// Equal-tempered frequency of a MIDI key (A4 = key 69 = 440 Hz).
pub fn key_frequency(key: i32) -> f32 {
    440.0 * 2f32.powf((key - 69) as f32 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_table_shape() {
        let table = sine_table();
        assert_eq!(table[0], 0);
        assert_eq!(table[SINE_TABLE_SIZE / 4], SINE_AMPLITUDE);
        assert_eq!(table[SINE_TABLE_SIZE / 2], 0);
        assert_eq!(table[SINE_TABLE_SIZE * 3 / 4], -SINE_AMPLITUDE);
    }

    #[test]
    fn test_level_table_is_decreasing() {
        let table = level_table();
        assert_eq!(table[0], LEVEL_MAX);
        assert_eq!(table[LEVEL_STEPS], 0);
        for pair in table.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
        // 6 dB is one halving, 64 steps
        assert!((table[64] - LEVEL_MAX / 2).abs() < 200);
        // TL 127 mutes an operator completely
        assert_eq!(table[127 * 8], 0);
    }

    #[test]
    fn test_envelope_times() {
        let table = envelope_time_table();
        assert!(table[0].is_infinite());
        assert!(table[1].is_infinite());
        assert_eq!(table[2], 120.0);
        assert!((table[6] - 60.0).abs() < 1e-3);
        assert_eq!(attack_time(63), 0.0);
        assert!(attack_time(0).is_infinite());
        assert_eq!(decay_steps_per_second(0), 0.0);
        assert!(decay_steps_per_second(40) < decay_steps_per_second(41));
    }

    #[test]
    fn test_keyscale_curves() {
        let table = keyscale_table();
        assert_eq!(table[0][127], 3);
        assert_eq!(table[3][127], 31);
        assert_eq!(table[3][0], 0);
        assert_eq!(table[2][64], 8);
    }

    #[test]
    fn test_detune_mirrors() {
        let table = detune_table();
        for key in 0..128 {
            assert_eq!(table[0][key], 0.0);
            assert_eq!(table[4][key], 0.0);
            for dt in 1..4 {
                assert_eq!(table[dt][key], -table[dt + 4][key]);
            }
        }
        assert!(table[3][127] > table[1][127]);
    }

    #[test]
    fn test_ams_table() {
        let table = ams_table();
        assert_eq!(table[0], 0);
        assert!(table[1] < table[2] && table[2] < table[3]);
        assert!(table[3] < 32768);
    }

    #[test]
    fn test_key_frequency() {
        assert!((key_frequency(69) - 440.0).abs() < 1e-3);
        assert!((key_frequency(81) - 880.0).abs() < 1e-2);
        assert!((key_frequency(60) - 261.63).abs() < 0.01);
    }
}
