// src/testgen/mod.rs
//
// Synthetic frames and signals for tests and demos. Frames are built
// directly in the byte-amplitude domain; signals are PCM that can be
// written to WAV with hound and fed back through the file source.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::config::FrequencyBand;
use crate::core::frame::Frame;

/// All-zero frame
pub fn silent_frame(bin_count: usize, sample_rate: u32, sequence: u64) -> Frame {
    flat_frame(bin_count, sample_rate, 0, sequence)
}

pub fn flat_frame(bin_count: usize, sample_rate: u32, amplitude: u8, sequence: u64) -> Frame {
    Frame::new(vec![amplitude; bin_count], sample_rate, sequence)
}

/// Copy of `frame` with one bin replaced
pub fn with_bin(frame: &Frame, bin: usize, amplitude: u8) -> Frame {
    let mut bins = frame.amplitudes().to_vec();
    if let Some(a) = bins.get_mut(bin) {
        *a = amplitude;
    }
    Frame::new(bins, frame.sample_rate(), frame.sequence())
}

/// Frame that trips the weighted primary score on its own
///
/// Two full-scale peaks a fifth apart (ratio 1.5) at 66% and 99% of
/// Nyquist over a sparse floor of ones: high centroid, rolloff and
/// high-band ratio, tonal flatness and a harmonic pair. Scores 11 with
/// default weights and no history. Needs at least 64 bins.
pub fn directed_frame(bin_count: usize, sample_rate: u32, sequence: u64) -> Frame {
    let mut bins = vec![0u8; bin_count];
    let low = (bin_count as f32 * 0.66) as usize;
    let high = (bin_count as f32 * 0.99) as usize;
    for a in bins.iter_mut().skip(low + 3).take(20) {
        *a = 1;
    }
    bins[low] = 255;
    bins[high] = 255;
    Frame::new(bins, sample_rate, sequence)
}

/// Frame with `fraction` of a band's bins set to `amplitude`, from the
/// bottom of the band up
pub fn band_frame(
    bin_count: usize,
    sample_rate: u32,
    band: &FrequencyBand,
    amplitude: u8,
    fraction: f32,
    sequence: u64,
) -> Frame {
    let empty = silent_frame(bin_count, sample_rate, sequence);
    let range = empty.band_bins(band);
    let count = (range.len() as f32 * fraction).ceil() as usize;

    let mut bins = vec![0u8; bin_count];
    for a in bins[range].iter_mut().take(count) {
        *a = amplitude;
    }
    Frame::new(bins, sample_rate, sequence)
}

/// Sum of equal-amplitude sines, normalised to `amplitude` peak
pub fn generate_tones(frequencies: &[f32], amplitude: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let n = (duration_secs * sample_rate as f32) as usize;
    if frequencies.is_empty() {
        return vec![0.0; n];
    }
    let scale = amplitude / frequencies.len() as f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            frequencies.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * scale
        })
        .collect()
}

/// Write mono 16-bit PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(v)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Unique WAV path in the system temp directory
pub fn temp_wav_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("spectralguard-{}-{}.wav", label, Uuid::new_v4()))
}
