//! Digital Signal Processing utilities

pub mod stats;

use std::f64::consts::PI;
use std::sync::Arc;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Window functions for spectral analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunction {
    Rectangular,
    Hann,
    Blackman,
}

impl Default for WindowFunction {
    fn default() -> Self {
        Self::Blackman
    }
}

impl WindowFunction {
    /// Generate window coefficients
    pub fn generate(&self, size: usize) -> Vec<f64> {
        if size < 2 {
            return vec![1.0; size];
        }
        match self {
            WindowFunction::Rectangular => vec![1.0; size],
            WindowFunction::Hann => (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
                .collect(),
            WindowFunction::Blackman => (0..size)
                .map(|i| {
                    let x = 2.0 * PI * i as f64 / (size - 1) as f64;
                    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
                })
                .collect(),
        }
    }
}

/// Turns PCM blocks into byte-amplitude spectra
///
/// Windowed FFT magnitude, exponentially smoothed across blocks, converted
/// to dB and mapped linearly from `[min_db, max_db]` onto 0-255. Produces
/// `fft_size / 2` bins.
pub struct ByteSpectrumAnalyzer {
    fft_size: usize,
    window: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
    smoothing: f64,
    min_db: f64,
    max_db: f64,
    smoothed: Vec<f64>,
}

impl ByteSpectrumAnalyzer {
    pub fn new(fft_size: usize, window_fn: WindowFunction) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft_size,
            window: window_fn.generate(fft_size),
            fft: planner.plan_fft_forward(fft_size),
            smoothing: 0.1,
            min_db: -100.0,
            max_db: -30.0,
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Blend factor with the previous block, 0 disables smoothing
    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    pub fn with_db_range(mut self, min_db: f64, max_db: f64) -> Self {
        self.min_db = min_db;
        self.max_db = max_db;
        self
    }

    /// Byte spectrum of one block; short blocks are zero-padded
    pub fn process(&mut self, samples: &[f32]) -> Vec<u8> {
        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let scale = 1.0 / self.fft_size as f64;
        let range = (self.max_db - self.min_db).max(f64::EPSILON);
        let tau = self.smoothing;
        let min_db = self.min_db;

        self.smoothed
            .iter_mut()
            .zip(buffer.iter())
            .map(|(prev, c)| {
                *prev = tau * *prev + (1.0 - tau) * c.norm() * scale;
                let db = if *prev > 0.0 { 20.0 * prev.log10() } else { f64::NEG_INFINITY };
                (255.0 / range * (db - min_db)).clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// Forget the smoothing state
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}
