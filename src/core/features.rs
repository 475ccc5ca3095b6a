// src/core/features.rs
//
// Per-frame feature extraction: spectral shape statistics, peak picking,
// harmonic-ratio matching and the temporal features computed over the
// frame history.

use serde::Serialize;

use super::dsp::stats;
use super::frame::Frame;
use super::history::FrameHistory;
use crate::config::FeatureConfig;

/// Adjacent-bin jump counted by the fluctuation rate
const FLUCTUATION_STEP: u8 = 10;

/// Features for one frame
///
/// All fields are 0/false when the frame is degenerate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    pub spectral_flux: f32,
    /// Hz
    pub spectral_centroid: f32,
    /// 0 (tonal) to 1 (flat)
    pub spectral_flatness: f32,
    /// Hz
    pub spectral_rolloff: f32,
    pub high_freq_energy_ratio: f32,
    pub harmonic_pattern: bool,
    pub temporal_pattern: bool,
    pub modulation: bool,
    /// Nyquist of the frame the features came from
    pub nyquist_hz: f32,
    /// Strongest peaks first
    pub peak_frequencies: Vec<f32>,
    pub fluctuation_rate: f32,
}

/// A local spectral maximum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub bin: usize,
    pub frequency_hz: f32,
    pub amplitude: u8,
}

/// Computes feature vectors; holds no per-frame state
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Features of `frame` given the history before it is pushed
    pub fn extract(&self, frame: &Frame, history: &FrameHistory) -> FeatureVector {
        if frame.is_degenerate() {
            return FeatureVector::default();
        }

        let bins = frame.amplitudes();
        let sample_rate = frame.sample_rate();

        let spectral_flux = history
            .latest()
            .map(|prev| stats::spectral_flux(prev.amplitudes(), bins))
            .unwrap_or(0.0);

        let peaks = self.find_peaks(frame);

        FeatureVector {
            spectral_flux,
            spectral_centroid: stats::spectral_centroid(bins, sample_rate),
            spectral_flatness: stats::spectral_flatness(bins),
            spectral_rolloff: stats::spectral_rolloff(bins, sample_rate, self.config.rolloff_fraction),
            high_freq_energy_ratio: stats::band_energy_ratio(bins, self.config.high_band_start),
            harmonic_pattern: self.has_harmonic_pattern(&peaks),
            temporal_pattern: self.has_temporal_pattern(frame, history),
            modulation: self.has_modulation(frame, history),
            nyquist_hz: frame.nyquist(),
            peak_frequencies: peaks.iter().map(|p| p.frequency_hz).collect(),
            fluctuation_rate: stats::fluctuation_rate(bins, FLUCTUATION_STEP),
        }
    }

    /// Bins above `max(mean + k * stddev, floor)` that beat both neighbours
    /// on each side, strongest first
    pub fn find_peaks(&self, frame: &Frame) -> Vec<Peak> {
        let bins = frame.amplitudes();
        if bins.len() < 5 {
            return Vec::new();
        }

        let threshold = (stats::mean(bins)
            + self.config.peak_stddev_multiplier * stats::std_dev(bins))
        .max(self.config.peak_floor);

        let mut peaks: Vec<Peak> = (2..bins.len() - 2)
            .filter(|&i| {
                let a = bins[i];
                a as f32 > threshold
                    && a > bins[i - 1]
                    && a > bins[i - 2]
                    && a > bins[i + 1]
                    && a > bins[i + 2]
            })
            .map(|i| Peak {
                bin: i,
                frequency_hz: frame.bin_frequency(i),
                amplitude: bins[i],
            })
            .collect();

        peaks.sort_by(|a, b| b.amplitude.cmp(&a.amplitude));
        if self.config.max_peaks > 0 {
            peaks.truncate(self.config.max_peaks);
        }
        peaks
    }

    /// Any pair of peaks whose frequency ratio sits near a harmonic ratio
    pub fn has_harmonic_pattern(&self, peaks: &[Peak]) -> bool {
        for (i, a) in peaks.iter().enumerate() {
            for b in &peaks[i + 1..] {
                let (lo, hi) = if a.frequency_hz <= b.frequency_hz {
                    (a.frequency_hz, b.frequency_hz)
                } else {
                    (b.frequency_hz, a.frequency_hz)
                };
                if lo <= 0.0 {
                    continue;
                }
                let ratio = hi / lo;
                let matched = self
                    .config
                    .harmonic_ratios
                    .iter()
                    .any(|&target| (ratio - target).abs() <= self.config.harmonic_tolerance * target);
                if matched {
                    return true;
                }
            }
        }
        false
    }

    /// Mean pairwise correlation across the history exceeds the threshold
    pub fn has_temporal_pattern(&self, frame: &Frame, history: &FrameHistory) -> bool {
        let frames = valid_history(frame, history);
        if frames.len() < 3 {
            return false;
        }

        let mut total = 0.0f64;
        let mut pairs = 0usize;
        for (i, a) in frames.iter().enumerate() {
            for b in &frames[i + 1..] {
                total += stats::normalized_correlation(a, b);
                pairs += 1;
            }
        }

        total / pairs as f64 > self.config.temporal_correlation as f64
    }

    /// Frame-to-frame energy changes are irregular relative to their size
    pub fn has_modulation(&self, frame: &Frame, history: &FrameHistory) -> bool {
        let frames = valid_history(frame, history);
        if frames.len() < 4 {
            return false;
        }

        let energies: Vec<f64> = frames.iter().map(|f| stats::energy(f)).collect();
        let diffs: Vec<f64> = energies.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let (mean_diff, std_diff) = stats::mean_std(&diffs);

        std_diff > self.config.modulation_ratio as f64 * mean_diff
    }
}

/// History frames comparable with the current one, oldest first
fn valid_history<'a>(frame: &Frame, history: &'a FrameHistory) -> Vec<&'a [u8]> {
    history
        .iter()
        .filter(|f| !f.is_empty() && f.bin_count() == frame.bin_count())
        .map(|f| f.amplitudes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(FeatureConfig::default())
    }

    fn frame_from(bins: Vec<u8>) -> Frame {
        Frame::new(bins, 48000, 0)
    }

    /// Flat background with isolated spikes
    fn spikes(len: usize, at: &[(usize, u8)]) -> Vec<u8> {
        let mut bins = vec![5u8; len];
        for &(i, a) in at {
            bins[i] = a;
        }
        bins
    }

    #[test]
    fn test_silent_frame_all_zero() {
        let frame = frame_from(vec![0u8; 8192]);
        let history = FrameHistory::new(5);
        let features = extractor().extract(&frame, &history);
        assert_eq!(features.spectral_flux, 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
        assert_eq!(features.spectral_flatness, 0.0);
        assert_eq!(features.spectral_rolloff, 0.0);
        assert_eq!(features.high_freq_energy_ratio, 0.0);
        assert!(!features.harmonic_pattern);
        assert!(!features.temporal_pattern);
        assert!(!features.modulation);
    }

    #[test]
    fn test_degenerate_frames_default() {
        let history = FrameHistory::new(5);
        let empty = Frame::new(Vec::<u8>::new(), 48000, 0);
        let no_rate = Frame::new(vec![200u8; 64], 0, 0);
        assert_eq!(extractor().extract(&empty, &history), FeatureVector::default());
        assert_eq!(extractor().extract(&no_rate, &history), FeatureVector::default());
    }

    #[test]
    fn test_single_high_bin_raises_flux_and_high_ratio() {
        let mut history = FrameHistory::new(5);
        let flat = frame_from(vec![0u8; 8192]);
        let ex = extractor();
        let flat_features = ex.extract(&flat, &history);
        history.push(flat);

        let mut bins = vec![0u8; 8192];
        bins[7000] = 255;
        let burst = frame_from(bins);
        let features = ex.extract(&burst, &history);

        assert!(features.spectral_flux > 0.0);
        assert!((features.spectral_flux - 255.0).abs() < 1e-3);
        assert!(features.high_freq_energy_ratio > flat_features.high_freq_energy_ratio);
    }

    #[test]
    fn test_flux_zero_on_length_mismatch() {
        let mut history = FrameHistory::new(5);
        history.push(frame_from(vec![100u8; 64]));
        let features = extractor().extract(&frame_from(vec![0u8; 128]), &history);
        assert_eq!(features.spectral_flux, 0.0);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let mut history = FrameHistory::new(5);
        for seq in 0..4u8 {
            history.push(frame_from(spikes(512, &[(40, 100 + seq * 20), (80, 120)])));
        }
        let frame = frame_from(spikes(512, &[(40, 200), (60, 180), (120, 150)]));
        let ex = extractor();
        assert_eq!(ex.extract(&frame, &history), ex.extract(&frame, &history));
    }

    #[test]
    fn test_bounds_on_flatness_and_rolloff() {
        let history = FrameHistory::new(5);
        let ex = extractor();
        for seed in 0..20u32 {
            let bins: Vec<u8> = (0..1024u32)
                .map(|i| (i.wrapping_mul(2654435761u32.wrapping_add(seed)) >> 24) as u8)
                .collect();
            let frame = frame_from(bins);
            let f = ex.extract(&frame, &history);
            assert!((0.0..=1.0).contains(&f.spectral_flatness));
            assert!(f.spectral_rolloff <= frame.nyquist());
        }
    }

    #[test]
    fn test_peaks_sorted_and_neighbour_rule() {
        let bins = spikes(256, &[(20, 120), (60, 250), (100, 180), (101, 179)]);
        let peaks = extractor().find_peaks(&frame_from(bins));
        let found: Vec<usize> = peaks.iter().map(|p| p.bin).collect();
        // 101 is beaten by its neighbour 100
        assert_eq!(found, vec![60, 100, 20]);
    }

    #[test]
    fn test_peak_cap() {
        let at: Vec<(usize, u8)> = (0..20).map(|k| (20 + k * 10, 150 + k as u8)).collect();
        let frame = frame_from(spikes(512, &at));
        assert_eq!(extractor().find_peaks(&frame).len(), 20);

        let capped = FeatureExtractor::new(FeatureConfig {
            max_peaks: 2,
            ..FeatureConfig::default()
        });
        let found: Vec<usize> = capped.find_peaks(&frame).iter().map(|p| p.bin).collect();
        assert_eq!(found, vec![210, 200]);
    }

    #[test]
    fn test_peaks_respect_floor() {
        // Spikes stand out statistically but stay under the floor of 50
        let bins = spikes(256, &[(20, 40), (60, 45)]);
        assert!(extractor().find_peaks(&frame_from(bins)).is_empty());
    }

    #[test]
    fn test_harmonic_octave_detected() {
        // 93.75 Hz per bin at 48 kHz / 256 bins; bins 40 and 80 form an octave
        let bins = spikes(256, &[(40, 200), (80, 180)]);
        let ex = extractor();
        let peaks = ex.find_peaks(&frame_from(bins));
        assert!(ex.has_harmonic_pattern(&peaks));
    }

    #[test]
    fn test_inharmonic_peaks_not_flagged() {
        // 40 -> 49 is a ratio of 1.225, outside 5% of every target
        let bins = spikes(256, &[(40, 200), (49, 180)]);
        let ex = extractor();
        let peaks = ex.find_peaks(&frame_from(bins));
        assert_eq!(peaks.len(), 2);
        assert!(!ex.has_harmonic_pattern(&peaks));
    }

    #[test]
    fn test_temporal_pattern_needs_three_frames() {
        let ex = extractor();
        let frame = frame_from(vec![100u8; 64]);
        let mut history = FrameHistory::new(5);
        history.push(frame_from(vec![100u8; 64]));
        history.push(frame_from(vec![100u8; 64]));
        assert!(!ex.has_temporal_pattern(&frame, &history));
        history.push(frame_from(vec![100u8; 64]));
        assert!(ex.has_temporal_pattern(&frame, &history));
    }

    #[test]
    fn test_temporal_pattern_rejects_disjoint_frames() {
        let ex = extractor();
        let frame = frame_from(vec![0u8; 64]);
        let mut history = FrameHistory::new(5);
        for start in [0usize, 16, 32] {
            let mut bins = vec![0u8; 64];
            bins[start..start + 16].iter_mut().for_each(|a| *a = 200);
            history.push(frame_from(bins));
        }
        assert!(!ex.has_temporal_pattern(&frame, &history));
    }

    #[test]
    fn test_temporal_ignores_mismatched_lengths() {
        let ex = extractor();
        let frame = frame_from(vec![100u8; 64]);
        let mut history = FrameHistory::new(5);
        history.push(frame_from(vec![100u8; 64]));
        history.push(frame_from(vec![100u8; 32]));
        history.push(frame_from(vec![100u8; 64]));
        assert!(!ex.has_temporal_pattern(&frame, &history));
    }

    #[test]
    fn test_modulation_irregular_energy() {
        let ex = extractor();
        let frame = frame_from(vec![10u8; 64]);
        let mut history = FrameHistory::new(5);
        // Energy jumps: big, none, big, none
        for level in [10u8, 200, 200, 10, 10] {
            history.push(frame_from(vec![level; 64]));
        }
        assert!(ex.has_modulation(&frame, &history));
    }

    #[test]
    fn test_modulation_falling_ramp_not_flagged() {
        let ex = extractor();
        let frame = frame_from(vec![0u8; 64]);
        let mut history = FrameHistory::new(5);
        // Energy falls by the same amount every frame
        for lit in [40usize, 30, 20, 10] {
            let mut bins = vec![0u8; 64];
            bins[..lit].fill(100);
            history.push(frame_from(bins));
        }
        assert!(!ex.has_modulation(&frame, &history));
    }

    #[test]
    fn test_modulation_steady_ramp_not_flagged() {
        let ex = extractor();
        let frame = frame_from(vec![10u8; 64]);
        let mut history = FrameHistory::new(5);
        // Constant energy steps: stddev of differences is 0
        for level in [0u8, 0, 0, 0] {
            history.push(frame_from(vec![level; 64]));
        }
        assert!(!ex.has_modulation(&frame, &history));

        let mut short = FrameHistory::new(5);
        for level in [10u8, 200, 10] {
            short.push(frame_from(vec![level; 64]));
        }
        assert!(!ex.has_modulation(&frame, &short));
    }
}
