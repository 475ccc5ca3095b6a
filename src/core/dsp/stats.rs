//! Statistical and spectral shape functions over byte-amplitude spectra
//!
//! Bin `i` of an `n`-bin spectrum sits at `i * sample_rate / (2 * n)` Hz.
//! Every function returns 0 for inputs it cannot measure.

/// Arithmetic mean
pub fn mean(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: u64 = data.iter().map(|&v| v as u64).sum();
    sum as f32 / data.len() as f32
}

/// Population standard deviation
pub fn std_dev(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance: f32 = data
        .iter()
        .map(|&v| {
            let d = v as f32 - m;
            d * d
        })
        .sum::<f32>()
        / data.len() as f32;
    variance.sqrt()
}

/// Mean and population standard deviation of real values
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let m = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
    (m, variance.sqrt())
}

/// Sum of squared amplitudes
pub fn energy(data: &[u8]) -> f64 {
    data.iter().map(|&v| (v as f64) * (v as f64)).sum()
}

fn bin_freq(i: usize, len: usize, sample_rate: u32) -> f32 {
    i as f32 * sample_rate as f32 / (2.0 * len as f32)
}

/// Amplitude-weighted mean frequency in Hz
pub fn spectral_centroid(magnitudes: &[u8], sample_rate: u32) -> f32 {
    let total: u64 = magnitudes.iter().map(|&m| m as u64).sum();
    if total == 0 {
        return 0.0;
    }

    let weighted_sum: f64 = magnitudes
        .iter()
        .enumerate()
        .map(|(i, &m)| bin_freq(i, magnitudes.len(), sample_rate) as f64 * m as f64)
        .sum();

    (weighted_sum / total as f64) as f32
}

/// Geometric over arithmetic mean of the non-zero amplitudes
///
/// 1.0 for a perfectly flat spectrum, towards 0.0 for tonal content.
/// 0.0 when every bin is silent.
pub fn spectral_flatness(magnitudes: &[u8]) -> f32 {
    let nonzero: Vec<f64> = magnitudes
        .iter()
        .filter(|&&m| m > 0)
        .map(|&m| m as f64)
        .collect();
    if nonzero.is_empty() {
        return 0.0;
    }

    let n = nonzero.len() as f64;
    let geometric_mean = (nonzero.iter().map(|m| m.ln()).sum::<f64>() / n).exp();
    let arithmetic_mean = nonzero.iter().sum::<f64>() / n;

    (geometric_mean / arithmetic_mean).clamp(0.0, 1.0) as f32
}

/// Frequency of the first bin where cumulative squared energy reaches
/// `percentile` of the total
pub fn spectral_rolloff(magnitudes: &[u8], sample_rate: u32, percentile: f32) -> f32 {
    let total = energy(magnitudes);
    if total <= 0.0 {
        return 0.0;
    }
    let threshold = total * percentile as f64;

    let mut cumulative = 0.0f64;
    for (i, &mag) in magnitudes.iter().enumerate() {
        cumulative += (mag as f64) * (mag as f64);
        if cumulative >= threshold {
            return bin_freq(i, magnitudes.len(), sample_rate);
        }
    }

    // Rounding left the cumulative sum short; the last bin holds the remainder
    bin_freq(magnitudes.len() - 1, magnitudes.len(), sample_rate)
}

/// Euclidean distance between consecutive spectra
pub fn spectral_flux(prev_spectrum: &[u8], curr_spectrum: &[u8]) -> f32 {
    if prev_spectrum.len() != curr_spectrum.len() {
        return 0.0;
    }

    prev_spectrum
        .iter()
        .zip(curr_spectrum)
        .map(|(&prev, &curr)| {
            let diff = curr as f64 - prev as f64;
            diff * diff
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// Squared energy from `start_fraction` of Nyquist upward over total energy
pub fn band_energy_ratio(magnitudes: &[u8], start_fraction: f32) -> f32 {
    let total = energy(magnitudes);
    if total <= 0.0 {
        return 0.0;
    }
    let start = (magnitudes.len() as f32 * start_fraction).floor() as usize;
    if start >= magnitudes.len() {
        return 0.0;
    }
    (energy(&magnitudes[start..]) / total) as f32
}

/// Dot product over the product of L2 norms; 0 if either is silent or
/// the lengths differ
pub fn normalized_correlation(a: &[u8], b: &[u8]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let norm_a = energy(a).sqrt();
    let norm_b = energy(b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(&x, &y)| x as f64 * y as f64).sum();
    dot / (norm_a * norm_b)
}

/// Fraction of adjacent-bin jumps larger than `step`
pub fn fluctuation_rate(magnitudes: &[u8], step: u8) -> f32 {
    if magnitudes.len() < 2 {
        return 0.0;
    }
    let jumps = magnitudes
        .windows(2)
        .filter(|w| w[0].abs_diff(w[1]) > step)
        .count();
    jumps as f32 / (magnitudes.len() - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let data = [2u8, 4, 4, 4, 5, 5, 7, 9];
        assert!((mean(&data) - 5.0).abs() < 1e-6);
        assert!((std_dev(&data) - 2.0).abs() < 1e-6);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_spectral_flatness_tonal() {
        let mut mags = vec![1u8; 100];
        for i in [10, 30, 50, 70, 90] {
            mags[i] = 255;
        }
        assert!(spectral_flatness(&mags) < 0.2);
    }

    #[test]
    fn test_spectral_flatness_flat() {
        let mags = vec![80u8; 100];
        assert!(spectral_flatness(&mags) > 0.99);
        // Zero bins are ignored
        let mut sparse = vec![0u8; 100];
        sparse[10] = 40;
        sparse[20] = 40;
        assert!(spectral_flatness(&sparse) > 0.99);
        assert_eq!(spectral_flatness(&[0u8; 10]), 0.0);
    }

    #[test]
    fn test_centroid_single_bin() {
        // 100 bins at 48 kHz: 240 Hz per bin
        let mut mags = vec![0u8; 100];
        mags[25] = 10;
        assert!((spectral_centroid(&mags, 48000) - 6000.0).abs() < 1e-3);
        assert_eq!(spectral_centroid(&[0u8; 100], 48000), 0.0);
    }

    #[test]
    fn test_rolloff() {
        let mut mags = vec![0u8; 100];
        mags[10] = 100;
        mags[90] = 10;
        // 99% of the energy is in bin 10
        assert!((spectral_rolloff(&mags, 48000, 0.85) - 2400.0).abs() < 1e-3);
        assert_eq!(spectral_rolloff(&[0u8; 100], 48000, 0.85), 0.0);
        assert!(spectral_rolloff(&[255u8; 100], 48000, 1.0) <= 24000.0);
    }

    #[test]
    fn test_flux() {
        assert_eq!(spectral_flux(&[1, 2, 3], &[1, 2, 3]), 0.0);
        assert!((spectral_flux(&[0, 0], &[3, 4]) - 5.0).abs() < 1e-6);
        assert_eq!(spectral_flux(&[0, 0], &[3, 4, 5]), 0.0);
    }

    #[test]
    fn test_band_energy_ratio() {
        let mut mags = vec![0u8; 100];
        mags[10] = 100;
        mags[80] = 100;
        assert!((band_energy_ratio(&mags, 0.75) - 0.5).abs() < 1e-6);
        assert_eq!(band_energy_ratio(&[0u8; 100], 0.75), 0.0);
        assert_eq!(band_energy_ratio(&[], 0.75), 0.0);
    }

    #[test]
    fn test_normalized_correlation() {
        let a = [10u8, 20, 30];
        assert!((normalized_correlation(&a, &a) - 1.0).abs() < 1e-9);
        assert!((normalized_correlation(&[10, 0], &[0, 10])).abs() < 1e-9);
        assert_eq!(normalized_correlation(&[0, 0], &[1, 1]), 0.0);
        assert_eq!(normalized_correlation(&[1, 1], &[1, 1, 1]), 0.0);
    }

    #[test]
    fn test_fluctuation_rate() {
        assert_eq!(fluctuation_rate(&[0, 50, 50, 100, 100], 10), 0.5);
        assert_eq!(fluctuation_rate(&[5], 10), 0.0);
    }
}
