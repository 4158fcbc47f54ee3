//! WAV decoding into the mono 16-bit buffers the analyzer works on.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use molebeat_core::AudioBuffer;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Decode a WAV file, downmixing every channel to mono
pub fn load_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    decode(reader)
}

pub fn decode<R: Read>(mut reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<_, _>>()
            .context("Corrupt 16-bit sample data")?,
        (SampleFormat::Int, bits @ 1..=32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| rescale_int(v, bits)))
            .collect::<Result<_, _>>()
            .context("Corrupt integer sample data")?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(float_to_i16))
            .collect::<Result<_, _>>()
            .context("Corrupt float sample data")?,
        (format, bits) => bail!("Unsupported WAV format: {:?} with {} bits", format, bits),
    };

    let mono = downmix(&interleaved, channels);
    debug!(
        channels,
        sample_rate = spec.sample_rate,
        frames = mono.len(),
        "decoded wav"
    );

    Ok(AudioBuffer::new(mono, spec.sample_rate)?)
}

/// Shift an integer sample of any width onto the 16-bit range
fn rescale_int(value: i32, bits: u16) -> i16 {
    let scaled = if bits > 16 {
        value >> (bits - 16)
    } else {
        value << (16 - bits)
    };
    scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn float_to_i16(value: f32) -> i16 {
    (value.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Average interleaved frames; a trailing partial frame is dropped
fn downmix(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}
