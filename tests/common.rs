#![allow(dead_code)]

use midisynth::fm::{FmNoteFactory, FmOperatorParameter, FmParameter};
use midisynth::{NoteFactory, Synthesizer};
use num_complex::Complex;
use rustfft::FftPlanner;

/// Variable-length quantity as stored in a track chunk
pub fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.insert(0, 0x80 | (value & 0x7F) as u8);
        value >>= 7;
    }
    bytes
}

/// Builds the body of an MTrk chunk
#[derive(Default)]
pub struct TrackBuilder {
    bytes: Vec<u8>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event `delta` ticks after the previous one
    pub fn event(mut self, delta: u32, data: &[u8]) -> Self {
        self.bytes.extend(vlq(delta));
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn tempo(self, delta: u32, micros_per_quarter: u32) -> Self {
        let t = micros_per_quarter.to_be_bytes();
        self.event(delta, &[0xFF, 0x51, 0x03, t[1], t[2], t[3]])
    }

    pub fn finish(self) -> Vec<u8> {
        self.event(0, &[0xFF, 0x2F, 0x00]).bytes
    }
}

/// Wraps track bodies in a complete Standard MIDI File
pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = b"MThd".to_vec();
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&format.to_be_bytes());
    bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    bytes.extend_from_slice(&division.to_be_bytes());
    for track in tracks {
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(track);
    }
    bytes
}

/// Operator with an instant attack that holds its level while keyed
pub fn sustained_operator(ml: u8, tl: u8) -> FmOperatorParameter {
    FmOperatorParameter {
        ar: 31,
        dr: 0,
        sr: 0,
        rr: 8,
        sl: 0,
        tl,
        ks: 0,
        ml,
        dt: 0,
        ams: 0,
    }
}

/// Operator that never makes a sound
pub fn silent_operator() -> FmOperatorParameter {
    sustained_operator(1, 127)
}

/// Factory holding one melodic program, number 0
pub fn single_program_factory(param: FmParameter) -> NoteFactory {
    let mut factory = FmNoteFactory::new();
    assert!(factory.set_program(0, param));
    NoteFactory::from(factory)
}

/// Plays one key on channel 0 and returns the left output as floats
pub fn render_key(
    synth: &mut Synthesizer,
    program: u8,
    key: u8,
    sample_rate: u32,
    frames: usize,
) -> Vec<f32> {
    synth.midi_message(0xC0 | (u32::from(program) << 8));
    synth.midi_message(0x90 | (u32::from(key) << 8) | (127 << 16));
    let mut out = vec![0i32; 2 * frames];
    synth.synthesize(&mut out, sample_rate as f32);
    out.chunks(2).map(|frame| frame[0] as f32).collect()
}

/// Estimates the fundamental from rising zero crossings, interpolating
/// between samples
pub fn zero_crossing_frequency(samples: &[f32], sample_rate: u32) -> f32 {
    let crossings: Vec<f32> = samples
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] < 0.0 && w[1] >= 0.0)
        .map(|(i, w)| i as f32 + w[0] / (w[0] - w[1]))
        .collect();

    if crossings.len() < 2 {
        return 0.0;
    }
    let span = crossings[crossings.len() - 1] - crossings[0];
    (crossings.len() - 1) as f32 * sample_rate as f32 / span
}

/// Hann-windowed magnitude spectrum, positive frequencies only
pub fn analyze_spectrum(samples: &[f32], sample_rate: u32) -> Vec<(f32, f32)> {
    let n = samples.len();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);

    let mut buffer: Vec<Complex<f32>> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let window = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos();
            Complex { re: s * window, im: 0.0 }
        })
        .collect();

    fft.process(&mut buffer);

    let bin_width = sample_rate as f32 / n as f32;
    buffer
        .iter()
        .take(n / 2)
        .enumerate()
        .map(|(i, c)| (i as f32 * bin_width, c.norm()))
        .collect()
}

/// Strongest magnitude within two bins of `freq`
pub fn magnitude_near(spectrum: &[(f32, f32)], freq: f32) -> f32 {
    let bin_width = spectrum.get(1).map_or(1.0, |(f, _)| *f);
    spectrum
        .iter()
        .filter(|(f, _)| (f - freq).abs() <= 2.0 * bin_width)
        .map(|(_, mag)| *mag)
        .fold(0.0f32, f32::max)
}
