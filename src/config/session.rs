// src/config/session.rs
//
// Session-wide configuration: feature extraction parameters, score
// thresholds, lock policy and stride. Immutable once a session starts.

use std::fs;
use std::path::Path;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::profiles::{default_profiles, FrequencyBand, OccupancyRule, ProfileTable, ThreatProfile};

/// Parameters for the feature extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Frames kept for temporal features
    pub history_len: usize,
    /// Peak threshold never drops below this amplitude
    pub peak_floor: f32,
    /// Peak threshold is `mean + peak_stddev_multiplier * stddev`
    pub peak_stddev_multiplier: f32,
    /// Strongest peaks considered for harmonic matching; 0 keeps all
    pub max_peaks: usize,
    pub harmonic_ratios: Vec<f32>,
    /// Relative tolerance for a harmonic ratio match
    pub harmonic_tolerance: f32,
    /// Mean pairwise history correlation above which a temporal pattern is flagged
    pub temporal_correlation: f32,
    /// Energy-difference stddev / mean above which modulation is flagged
    pub modulation_ratio: f32,
    /// Energy fraction for the rolloff frequency
    pub rolloff_fraction: f32,
    /// Start of the high band as a fraction of Nyquist
    pub high_band_start: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            history_len: 5,
            peak_floor: 50.0,
            peak_stddev_multiplier: 2.0,
            max_peaks: 0,
            harmonic_ratios: vec![1.33, 1.5, 2.0, 3.0, 4.0],
            harmonic_tolerance: 0.05,
            temporal_correlation: 0.7,
            modulation_ratio: 0.5,
            rolloff_fraction: 0.85,
            high_band_start: 0.75,
        }
    }
}

/// Points each heuristic adds to the primary score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub flux: u32,
    pub centroid: u32,
    pub flatness: u32,
    pub rolloff: u32,
    pub harmonic: u32,
    pub temporal: u32,
    pub high_freq: u32,
    pub modulation: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            flux: 2,
            centroid: 2,
            flatness: 1,
            rolloff: 2,
            harmonic: 3,
            temporal: 2,
            high_freq: 3,
            modulation: 3,
        }
    }
}

impl ScoreWeights {
    pub fn max_score(&self) -> u32 {
        self.flux
            + self.centroid
            + self.flatness
            + self.rolloff
            + self.harmonic
            + self.temporal
            + self.high_freq
            + self.modulation
    }
}

/// Decision boundaries for the primary weighted score
///
/// Empirically tuned; none of these are physical constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreThresholds {
    pub flux: f32,
    /// Fraction of Nyquist
    pub centroid_fraction: f32,
    pub flatness: f32,
    /// Fraction of Nyquist
    pub rolloff_fraction: f32,
    pub high_freq_ratio: f32,
    /// Score at or above which the primary profile is detected
    pub detection_score: u32,
    pub weights: ScoreWeights,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            flux: 1000.0,
            centroid_fraction: 0.6,
            flatness: 0.2,
            rolloff_fraction: 0.7,
            high_freq_ratio: 0.3,
            detection_score: 8,
            weights: ScoreWeights::default(),
        }
    }
}

/// How many locks may be held at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// One aggregate lock for the whole session
    Single,
    /// Independent lock per profile plus a combined all-locked event
    #[value(alias = "per_profile")]
    PerProfile,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::Single
    }
}

/// Amplitude boost applied around the locked bin of the display frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightConfig {
    pub radius_bins: usize,
    pub gain: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            radius_bins: 5,
            gain: 1.5,
        }
    }
}

/// Complete configuration for one capture session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub features: FeatureConfig,
    pub scoring: ScoreThresholds,
    pub profiles: ProfileTable,
    /// Full analysis runs on every `stride`-th tick
    pub stride: usize,
    pub lock_policy: LockPolicy,
    /// Profiles whose detection drives the countermeasure trigger
    pub countermeasure_profiles: Vec<ThreatProfile>,
    pub highlight: Option<HighlightConfig>,
    /// Most recent lock records kept in the session summary
    pub lock_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            scoring: ScoreThresholds::default(),
            profiles: default_profiles(),
            stride: 3,
            lock_policy: LockPolicy::default(),
            countermeasure_profiles: vec![ThreatProfile::Directed],
            highlight: None,
            lock_history: 64,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::Load {
            path: path.to_path_buf(),
            source: e,
        };

        let text = fs::read_to_string(path).map_err(|e| load_err(Box::new(e)))?;
        let config: SessionConfig = serde_json::from_str(&text).map_err(|e| load_err(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.features.history_len == 0 {
            return Err(ConfigError::InvalidHistoryLength);
        }
        if self.stride == 0 {
            return Err(ConfigError::InvalidStride);
        }

        let f = &self.features;
        check_param("peak_floor", f.peak_floor, |v| v >= 0.0)?;
        check_param("peak_stddev_multiplier", f.peak_stddev_multiplier, |v| v >= 0.0)?;
        check_param("harmonic_tolerance", f.harmonic_tolerance, |v| v >= 0.0)?;
        check_param("rolloff_fraction", f.rolloff_fraction, |v| v > 0.0 && v <= 1.0)?;
        check_param("high_band_start", f.high_band_start, |v| (0.0..1.0).contains(&v))?;
        check_param("modulation_ratio", f.modulation_ratio, |v| v >= 0.0)?;
        for &ratio in &f.harmonic_ratios {
            check_param("harmonic_ratio", ratio, |v| v > 0.0)?;
        }

        for profile in ThreatProfile::all() {
            let settings = self
                .profiles
                .get(&profile)
                .ok_or(ConfigError::MissingProfile(profile))?;
            settings.validate(profile)?;
        }

        if let Some(h) = &self.highlight {
            check_param("highlight_gain", h.gain, |v| v >= 0.0)?;
        }

        Ok(())
    }

    /// Profiles that are enabled, in priority order
    pub fn enabled_profiles(&self) -> Vec<ThreatProfile> {
        ThreatProfile::all()
            .into_iter()
            .filter(|p| self.profiles.get(p).map(|s| s.enabled).unwrap_or(false))
            .collect()
    }
}

fn check_param(name: &'static str, value: f32, ok: impl Fn(f32) -> bool) -> Result<(), ConfigError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Builder for session configs
pub struct ConfigBuilder {
    config: SessionConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.config.stride = stride;
        self
    }

    pub fn history_len(mut self, len: usize) -> Self {
        self.config.features.history_len = len;
        self
    }

    pub fn detection_score(mut self, score: u32) -> Self {
        self.config.scoring.detection_score = score;
        self
    }

    pub fn peak_threshold(mut self, floor: f32, stddev_multiplier: f32) -> Self {
        self.config.features.peak_floor = floor;
        self.config.features.peak_stddev_multiplier = stddev_multiplier;
        self
    }

    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.config.lock_policy = policy;
        self
    }

    pub fn band(mut self, profile: ThreatProfile, min_hz: f32, max_hz: f32) -> Self {
        self.profile_mut(profile).band = FrequencyBand::new(min_hz, max_hz);
        self
    }

    pub fn occupancy_rule(mut self, profile: ThreatProfile, amplitude_floor: u8, occupancy: f32) -> Self {
        self.profile_mut(profile).rule = Some(OccupancyRule {
            amplitude_floor,
            occupancy,
        });
        self
    }

    pub fn confirm_ticks(mut self, profile: ThreatProfile, ticks: u32) -> Self {
        self.profile_mut(profile).confirm_ticks = ticks;
        self
    }

    pub fn disable(mut self, profile: ThreatProfile) -> Self {
        self.profile_mut(profile).enabled = false;
        self
    }

    pub fn countermeasure_profiles(mut self, profiles: Vec<ThreatProfile>) -> Self {
        self.config.countermeasure_profiles = profiles;
        self
    }

    pub fn lock_history(mut self, records: usize) -> Self {
        self.config.lock_history = records;
        self
    }

    pub fn highlight(mut self, radius_bins: usize, gain: f32) -> Self {
        self.config.highlight = Some(HighlightConfig { radius_bins, gain });
        self
    }

    /// Validate and return the config
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    fn profile_mut(&mut self, profile: ThreatProfile) -> &mut super::profiles::ProfileSettings {
        self.config
            .profiles
            .entry(profile)
            .or_insert_with(|| super::profiles::ProfileSettings::for_profile(profile))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.history_len, 5);
        assert_eq!(config.stride, 3);
        assert_eq!(config.scoring.detection_score, 8);
        assert_eq!(config.scoring.weights.max_score(), 18);
    }

    #[test]
    fn test_builder_rejects_inverted_band() {
        let result = ConfigBuilder::new()
            .band(ThreatProfile::MidBandIntensity, 10_000.0, 2_000.0)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidBand { .. })));
    }

    #[test]
    fn test_builder_rejects_zero_history_and_stride() {
        assert!(matches!(
            ConfigBuilder::new().history_len(0).build(),
            Err(ConfigError::InvalidHistoryLength)
        ));
        assert!(matches!(
            ConfigBuilder::new().stride(0).build(),
            Err(ConfigError::InvalidStride)
        ));
    }

    #[test]
    fn test_missing_profile_rejected() {
        let mut config = SessionConfig::default();
        config.profiles.remove(&ThreatProfile::HighFrequencyBurst);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingProfile(ThreatProfile::HighFrequencyBurst))
        ));
    }

    #[test]
    fn test_json_partial_config_uses_defaults() {
        let json = r#"{ "stride": 1, "lock_policy": "per_profile" }"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.stride, 1);
        assert_eq!(config.lock_policy, LockPolicy::PerProfile);
        assert_eq!(config.features.history_len, 5);
        assert_eq!(config.profiles.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip_keeps_profiles() {
        let config = ConfigBuilder::new()
            .occupancy_rule(ThreatProfile::MidBandIntensity, 180, 0.25)
            .highlight(3, 2.0)
            .build()
            .unwrap();
        let json = config.to_json().unwrap();
        let parsed: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionConfig::from_json_file("/nonexistent/spectralguard.json");
        assert!(matches!(result, Err(ConfigError::Load { .. })));
    }

    #[test]
    fn test_enabled_profiles_skips_disabled() {
        let config = ConfigBuilder::new()
            .disable(ThreatProfile::HighFrequencyBurst)
            .build()
            .unwrap();
        assert_eq!(
            config.enabled_profiles(),
            vec![ThreatProfile::Directed, ThreatProfile::MidBandIntensity]
        );
    }
}
