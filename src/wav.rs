use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hound::{WavSpec, WavWriter};

fn stereo_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Writes interleaved stereo frames as 16-bit PCM, clipping anything out of range.
fn write_samples<W: Write + Seek>(writer: W, samples: &[i32], sample_rate: u32) -> Result<()> {
    let mut wav_writer = WavWriter::new(writer, stereo_spec(sample_rate))?;
    for &sample in samples {
        wav_writer.write_sample(clip(sample))?;
    }
    wav_writer.finalize()?;
    Ok(())
}

/// Encodes interleaved stereo frames into an in-memory WAV file
pub fn encode_wav(samples: &[i32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut wav = vec![];
    write_samples(std::io::Cursor::new(&mut wav), samples, sample_rate)?;
    Ok(wav)
}

pub fn write_wav(path: impl AsRef<Path>, samples: &[i32], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating '{}'", path.display()))?;
    write_samples(std::io::BufWriter::new(file), samples, sample_rate)
        .with_context(|| format!("writing '{}'", path.display()))
}

fn clip(sample: i32) -> i16 {
    sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
