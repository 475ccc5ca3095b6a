//! Configuration errors, rejected before a session starts

use std::path::PathBuf;
use thiserror::Error;

use super::profiles::ThreatProfile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid band for {profile}: min {min_hz} Hz must be below max {max_hz} Hz")]
    InvalidBand {
        profile: ThreatProfile,
        min_hz: f32,
        max_hz: f32,
    },

    #[error("invalid occupancy fraction {occupancy} for {profile}: must be in (0, 1]")]
    InvalidOccupancy { profile: ThreatProfile, occupancy: f32 },

    #[error("confirm_ticks for {profile} must be at least 1")]
    InvalidConfirmTicks { profile: ThreatProfile },

    #[error("history length must be at least 1")]
    InvalidHistoryLength,

    #[error("tick stride must be at least 1")]
    InvalidStride,

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error("no settings for profile {0}")]
    MissingProfile(ThreatProfile),

    #[error("failed to load config from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
