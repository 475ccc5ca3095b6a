// src/core/frame.rs
//
// One capture tick: byte amplitudes per frequency bin plus the sample
// rate that produced them.

use std::sync::Arc;

use crate::config::FrequencyBand;

/// Byte-amplitude spectrum for one capture tick
///
/// Amplitudes are shared, so cloning a frame into the history or a lock
/// snapshot does not copy the bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    amplitudes: Arc<[u8]>,
    sample_rate: u32,
    sequence: u64,
}

impl Frame {
    pub fn new(amplitudes: impl Into<Arc<[u8]>>, sample_rate: u32, sequence: u64) -> Self {
        Self {
            amplitudes: amplitudes.into(),
            sample_rate,
            sequence,
        }
    }

    pub fn amplitudes(&self) -> &[u8] {
        &self.amplitudes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn bin_count(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Empty frames and frames without a sample rate carry no usable spectrum
    pub fn is_degenerate(&self) -> bool {
        self.amplitudes.is_empty() || self.sample_rate == 0
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Frequency spacing between adjacent bins
    pub fn bin_width(&self) -> f32 {
        if self.amplitudes.is_empty() {
            return 0.0;
        }
        self.sample_rate as f32 / (2.0 * self.amplitudes.len() as f32)
    }

    /// Center frequency of bin `i`
    pub fn bin_frequency(&self, i: usize) -> f32 {
        i as f32 * self.bin_width()
    }

    /// Bin index range `[start, end)` covering a band, clipped to the frame
    pub fn band_bins(&self, band: &FrequencyBand) -> std::ops::Range<usize> {
        let width = self.bin_width();
        if width <= 0.0 {
            return 0..0;
        }
        let n = self.amplitudes.len();
        let start = ((band.min_hz / width).floor() as usize).min(n);
        let end = ((band.max_hz / width).floor() as usize).min(n);
        start..end.max(start)
    }

    /// Highest-amplitude bin inside a band; first one wins on ties
    pub fn dominant_bin(&self, band: &FrequencyBand) -> Option<usize> {
        let range = self.band_bins(band);
        let start = range.start;
        self.amplitudes[range]
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, u8)>, (i, &a)| match best {
                Some((_, b)) if b >= a => best,
                _ => Some((start + i, a)),
            })
            .map(|(i, _)| i)
    }

    /// Mean amplitude as a 0-100 percentage
    pub fn signal_strength(&self) -> f32 {
        if self.amplitudes.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.amplitudes.iter().map(|&a| a as u64).sum();
        let average = sum as f32 / self.amplitudes.len() as f32;
        (average / 255.0 * 100.0).clamp(0.0, 100.0)
    }

    /// Copy with amplitudes scaled by `gain` within `radius` bins of `center`
    pub fn highlighted(&self, center: usize, radius: usize, gain: f32) -> Frame {
        let mut bins = self.amplitudes.to_vec();
        let start = center.saturating_sub(radius);
        let end = center.saturating_add(radius).saturating_add(1).min(bins.len());
        for a in bins.iter_mut().take(end).skip(start) {
            *a = (*a as f32 * gain).round().clamp(0.0, 255.0) as u8;
        }
        Frame::new(bins, self.sample_rate, self.sequence)
    }
}
