mod common;
use common::{
    analyze_spectrum, magnitude_near, render_key, silent_operator, single_program_factory,
    sustained_operator,
};

use midisynth::fm::FmParameter;
use midisynth::Synthesizer;

const SAMPLE_RATE: u32 = 44100;
const FFT_SIZE: usize = 8192;

/// Find the frequency of the strongest bin
fn dominant_frequency(spectrum: &[(f32, f32)]) -> f32 {
    spectrum
        .iter()
        .skip(1)
        .fold((0.0f32, 0.0f32), |best, &(f, m)| if m > best.1 { (f, m) } else { best })
        .0
}

fn render_program(param: FmParameter, key: u8) -> Vec<(f32, f32)> {
    let mut synth = Synthesizer::new(single_program_factory(param));
    let samples = render_key(&mut synth, 0, key, SAMPLE_RATE, FFT_SIZE);
    analyze_spectrum(&samples, SAMPLE_RATE)
}

#[test]
fn test_single_operator_is_pure_sine() {
    let param = FmParameter {
        alg: 7,
        fb: 7,
        lfo: 0,
        op: [
            sustained_operator(1, 0),
            silent_operator(),
            silent_operator(),
            silent_operator(),
        ],
    };
    let spectrum = render_program(param, 69);

    let peak = dominant_frequency(&spectrum);
    assert!((peak - 440.0).abs() < 6.0, "peak at {} Hz", peak);

    let fundamental = magnitude_near(&spectrum, 440.0);
    for harmonic in [880.0, 1320.0, 1760.0] {
        let mag = magnitude_near(&spectrum, harmonic);
        assert!(
            mag < fundamental * 0.001,
            "unexpected energy at {} Hz: {} vs {}",
            harmonic,
            mag,
            fundamental
        );
    }
}

#[test]
fn test_half_multiplier() {
    let param = FmParameter {
        alg: 7,
        fb: 7,
        lfo: 0,
        op: [
            sustained_operator(0, 0),
            silent_operator(),
            silent_operator(),
            silent_operator(),
        ],
    };
    let spectrum = render_program(param, 69);
    let peak = dominant_frequency(&spectrum);
    assert!((peak - 220.0).abs() < 6.0, "peak at {} Hz", peak);
}

#[test]
fn test_default_piano_harmonics() {
    // program 0 mixes four carriers at 1x-4x the key frequency
    let mut synth = Synthesizer::default();
    let samples = render_key(&mut synth, 0, 69, SAMPLE_RATE, FFT_SIZE);
    let spectrum = analyze_spectrum(&samples, SAMPLE_RATE);

    let peak = dominant_frequency(&spectrum);
    assert!((peak - 440.0).abs() < 6.0, "peak at {} Hz", peak);

    let gap = [660.0, 1100.0, 1540.0]
        .iter()
        .map(|&f| magnitude_near(&spectrum, f))
        .fold(0.0f32, f32::max);
    for harmonic in [440.0, 880.0, 1320.0, 1760.0] {
        let mag = magnitude_near(&spectrum, harmonic);
        assert!(
            mag > gap * 10.0,
            "harmonic at {} Hz too weak: {} vs {}",
            harmonic,
            mag,
            gap
        );
    }
}

#[test]
fn test_modulator_adds_sidebands() {
    // ALG0 with only operators 3 > 4 audible
    let param = FmParameter {
        alg: 0,
        fb: 7,
        lfo: 0,
        op: [
            silent_operator(),
            silent_operator(),
            sustained_operator(1, 16),
            sustained_operator(1, 0),
        ],
    };
    let spectrum = render_program(param, 69);

    let fundamental = magnitude_near(&spectrum, 440.0);
    let second = magnitude_near(&spectrum, 880.0);
    assert!(
        second > fundamental * 0.1,
        "no sideband at 880 Hz: {} vs {}",
        second,
        fundamental
    );
    // sidebands stay on the harmonic grid
    assert!(magnitude_near(&spectrum, 660.0) < fundamental * 0.01);
}
