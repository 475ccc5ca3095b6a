// src/core/scorer.rs
//
// Maps feature vectors to per-profile verdicts. The primary profile uses
// a weighted sum of eight heuristics against a fixed threshold; the
// secondary profiles use band occupancy.

use serde::Serialize;

use super::features::FeatureVector;
use super::frame::Frame;
use crate::config::{FrequencyBand, OccupancyRule, ScoreThresholds, SessionConfig, ThreatProfile};

/// Individual heuristics contributing to the primary score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    Flux,
    Centroid,
    Flatness,
    Rolloff,
    Harmonic,
    Temporal,
    HighFrequencyEnergy,
    Modulation,
}

/// Weighted score for the primary profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThreatScore {
    pub score: u32,
    pub detected: bool,
    pub triggered: Vec<Heuristic>,
}

/// One profile's raw verdict for a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileVerdict {
    pub profile: ThreatProfile,
    /// Weighted score, or bins above the floor for occupancy profiles
    pub score: u32,
    pub detected: bool,
    /// Fraction of band bins above the floor (occupancy profiles only)
    pub occupancy: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ThreatScorer {
    thresholds: ScoreThresholds,
    profiles: Vec<(ThreatProfile, FrequencyBand, Option<OccupancyRule>)>,
}

impl ThreatScorer {
    pub fn new(config: &SessionConfig) -> Self {
        let profiles = config
            .enabled_profiles()
            .into_iter()
            .filter_map(|p| config.profiles.get(&p).map(|s| (p, s.band, s.rule)))
            .collect();
        Self {
            thresholds: config.scoring,
            profiles,
        }
    }

    pub fn thresholds(&self) -> &ScoreThresholds {
        &self.thresholds
    }

    /// Weighted heuristic score
    pub fn score_features(&self, features: &FeatureVector) -> ThreatScore {
        let t = &self.thresholds;
        let w = &t.weights;
        let nyquist = features.nyquist_hz;

        // Flatness of 0 means "no spectrum", not "tonal"
        let checks = [
            (features.spectral_flux > t.flux, Heuristic::Flux, w.flux),
            (
                nyquist > 0.0 && features.spectral_centroid > t.centroid_fraction * nyquist,
                Heuristic::Centroid,
                w.centroid,
            ),
            (
                features.spectral_flatness > 0.0 && features.spectral_flatness < t.flatness,
                Heuristic::Flatness,
                w.flatness,
            ),
            (
                nyquist > 0.0 && features.spectral_rolloff > t.rolloff_fraction * nyquist,
                Heuristic::Rolloff,
                w.rolloff,
            ),
            (features.harmonic_pattern, Heuristic::Harmonic, w.harmonic),
            (features.temporal_pattern, Heuristic::Temporal, w.temporal),
            (
                features.high_freq_energy_ratio > t.high_freq_ratio,
                Heuristic::HighFrequencyEnergy,
                w.high_freq,
            ),
            (features.modulation, Heuristic::Modulation, w.modulation),
        ];

        let mut score = ThreatScore::default();
        for (hit, heuristic, weight) in checks {
            if hit {
                score.score += weight;
                score.triggered.push(heuristic);
            }
        }
        score.detected = score.score >= t.detection_score;
        score
    }

    /// Raw verdicts for every enabled profile, in priority order
    ///
    /// Profiles without an occupancy rule take `primary`.
    pub fn evaluate(&self, frame: &Frame, primary: &ThreatScore) -> Vec<ProfileVerdict> {
        self.profiles
            .iter()
            .map(|(profile, band, rule)| match rule {
                _ if frame.is_degenerate() => ProfileVerdict {
                    profile: *profile,
                    score: 0,
                    detected: false,
                    occupancy: rule.as_ref().map(|_| 0.0),
                },
                None => ProfileVerdict {
                    profile: *profile,
                    score: primary.score,
                    detected: primary.detected,
                    occupancy: None,
                },
                Some(rule) => band_occupancy(frame, *profile, band, rule),
            })
            .collect()
    }
}

/// Occupancy verdict: more than `rule.occupancy` of the band above the floor
pub fn band_occupancy(
    frame: &Frame,
    profile: ThreatProfile,
    band: &FrequencyBand,
    rule: &OccupancyRule,
) -> ProfileVerdict {
    let range = frame.band_bins(band);
    let width = range.len();
    let above = frame.amplitudes()[range]
        .iter()
        .filter(|&&a| a > rule.amplitude_floor)
        .count();

    let fraction = if width > 0 { above as f32 / width as f32 } else { 0.0 };

    ProfileVerdict {
        profile,
        score: above as u32,
        detected: width > 0 && above as f32 > width as f32 * rule.occupancy,
        occupancy: Some(fraction),
    }
}
