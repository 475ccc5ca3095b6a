//! Configuration module for SpectralGuard

mod error;
mod profiles;
mod session;

pub use error::ConfigError;
pub use profiles::{
    default_profiles, FrequencyBand, OccupancyRule, ProfileSettings, ProfileTable, ThreatProfile,
};
pub use session::{
    ConfigBuilder, FeatureConfig, HighlightConfig, LockPolicy, ScoreThresholds, ScoreWeights,
    SessionConfig,
};
