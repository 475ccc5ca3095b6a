//! Pure classification stage: frame + history in, verdicts out

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{SessionConfig, ThreatProfile};
use crate::core::features::{FeatureExtractor, FeatureVector};
use crate::core::frame::Frame;
use crate::core::history::FrameHistory;
use crate::core::scorer::{ProfileVerdict, ThreatScore, ThreatScorer};

/// Everything the pure stage knows about one analysed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub sequence: u64,
    pub features: FeatureVector,
    pub primary: ThreatScore,
    /// Raw per-profile verdicts, in priority order
    pub verdicts: Vec<ProfileVerdict>,
    pub signal_strength: f32,
}

impl Classification {
    /// Profiles whose raw verdict fired on this frame
    pub fn raw_detected(&self) -> Vec<ThreatProfile> {
        self.verdicts.iter().filter(|v| v.detected).map(|v| v.profile).collect()
    }

    pub fn verdict(&self, profile: ThreatProfile) -> Option<&ProfileVerdict> {
        self.verdicts.iter().find(|v| v.profile == profile)
    }
}

/// Feature extraction followed by scoring
#[derive(Debug, Clone)]
pub struct Classifier {
    extractor: FeatureExtractor,
    scorer: ThreatScorer,
}

impl Classifier {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            extractor: FeatureExtractor::new(config.features.clone()),
            scorer: ThreatScorer::new(config),
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn scorer(&self) -> &ThreatScorer {
        &self.scorer
    }

    /// Classify `frame` against the history that precedes it
    pub fn classify(&self, frame: &Frame, history: &FrameHistory) -> Classification {
        let features = self.extractor.extract(frame, history);
        let primary = if frame.is_degenerate() {
            ThreatScore::default()
        } else {
            self.scorer.score_features(&features)
        };
        let verdicts = self.scorer.evaluate(frame, &primary);

        Classification {
            sequence: frame.sequence(),
            features,
            primary,
            verdicts,
            signal_strength: frame.signal_strength(),
        }
    }
}

/// A profile's debounced state after one analysed tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub profile: ThreatProfile,
    pub score: u32,
    /// Raw verdict on this tick
    pub raw: bool,
    /// Raw verdict held for the profile's confirmation window
    pub confirmed: bool,
    /// Consecutive raw hits so far
    pub streak: u32,
}

/// Requires a raw verdict to hold for `confirm_ticks` consecutive
/// analysed ticks before it counts; a miss resets the streak
#[derive(Debug, Clone)]
pub struct Debouncer {
    required: BTreeMap<ThreatProfile, u32>,
    streaks: BTreeMap<ThreatProfile, u32>,
}

impl Debouncer {
    pub fn new(config: &SessionConfig) -> Self {
        let required = config
            .profiles
            .iter()
            .map(|(p, s)| (*p, s.confirm_ticks.max(1)))
            .collect();
        Self {
            required,
            streaks: BTreeMap::new(),
        }
    }

    pub fn confirm(&mut self, verdicts: &[ProfileVerdict]) -> Vec<Detection> {
        verdicts
            .iter()
            .map(|v| {
                let streak = self.streaks.entry(v.profile).or_insert(0);
                *streak = if v.detected { streak.saturating_add(1) } else { 0 };
                let required = self.required.get(&v.profile).copied().unwrap_or(1);
                Detection {
                    profile: v.profile,
                    score: v.score,
                    raw: v.detected,
                    confirmed: *streak >= required,
                    streak: *streak,
                }
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.streaks.clear();
    }
}
