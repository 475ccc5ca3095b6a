// src/config/profiles.rs
//
// Threat profiles and their per-profile detection settings

use std::collections::BTreeMap;
use std::fmt;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Threat categories the scorer classifies frames against
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ThreatProfile {
    /// High-frequency, modulated "directed" signal (weighted score)
    Directed,
    /// High-intensity energy spread across the mid band
    #[value(aliases = ["mid_band_intensity", "mid_band", "mid-band"])]
    MidBandIntensity,
    /// Short high-frequency bursts near the top of the spectrum
    #[value(aliases = ["high_frequency_burst", "burst"])]
    HighFrequencyBurst,
}

impl ThreatProfile {
    /// All profiles in lock-priority order
    pub fn all() -> Vec<Self> {
        vec![
            Self::Directed,
            Self::MidBandIntensity,
            Self::HighFrequencyBurst,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThreatProfile::Directed => "directed",
            ThreatProfile::MidBandIntensity => "mid_band_intensity",
            ThreatProfile::HighFrequencyBurst => "high_frequency_burst",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ThreatProfile::Directed => "High-frequency modulated signal",
            ThreatProfile::MidBandIntensity => "High-intensity energy in the 2-10 kHz band",
            ThreatProfile::HighFrequencyBurst => "High-frequency burst near the top of the spectrum",
        }
    }

    /// Lower value wins when several profiles fire on the same tick
    pub fn priority(&self) -> u8 {
        match self {
            ThreatProfile::Directed => 0,
            ThreatProfile::MidBandIntensity => 1,
            ThreatProfile::HighFrequencyBurst => 2,
        }
    }
}

impl fmt::Display for ThreatProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Closed-open frequency range in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub min_hz: f32,
    pub max_hz: f32,
}

impl FrequencyBand {
    pub const fn new(min_hz: f32, max_hz: f32) -> Self {
        Self { min_hz, max_hz }
    }

    pub fn contains(&self, freq_hz: f32) -> bool {
        freq_hz >= self.min_hz && freq_hz < self.max_hz
    }

    pub fn width(&self) -> f32 {
        self.max_hz - self.min_hz
    }

    pub(crate) fn validate(&self, profile: ThreatProfile) -> Result<(), ConfigError> {
        let ok = self.min_hz.is_finite()
            && self.max_hz.is_finite()
            && self.min_hz >= 0.0
            && self.min_hz < self.max_hz;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidBand {
                profile,
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            })
        }
    }
}

/// Band-occupancy rule used by the secondary profiles
///
/// Detected when more than `occupancy` of the bins in the profile band
/// exceed `amplitude_floor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancyRule {
    pub amplitude_floor: u8,
    pub occupancy: f32,
}

/// Settings for one threat profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Characteristic sub-band; the lock target is picked from here
    pub band: FrequencyBand,
    /// Occupancy rule; `None` means the profile uses the weighted score
    pub rule: Option<OccupancyRule>,
    /// Consecutive analysed ticks the raw detection must hold
    pub confirm_ticks: u32,
    pub enabled: bool,
}

impl ProfileSettings {
    /// Defaults for a profile
    pub fn for_profile(profile: ThreatProfile) -> Self {
        match profile {
            ThreatProfile::Directed => Self {
                band: FrequencyBand::new(15_000.0, 20_000.0),
                rule: None,
                confirm_ticks: 1,
                enabled: true,
            },
            ThreatProfile::MidBandIntensity => Self {
                band: FrequencyBand::new(2_000.0, 10_000.0),
                rule: Some(OccupancyRule {
                    amplitude_floor: 200,
                    occupancy: 0.3,
                }),
                confirm_ticks: 1,
                enabled: true,
            },
            // Bursts flicker, so the raw signal must hold for several ticks
            ThreatProfile::HighFrequencyBurst => Self {
                band: FrequencyBand::new(18_000.0, 24_000.0),
                rule: Some(OccupancyRule {
                    amplitude_floor: 200,
                    occupancy: 0.05,
                }),
                confirm_ticks: 5,
                enabled: true,
            },
        }
    }

    pub(crate) fn validate(&self, profile: ThreatProfile) -> Result<(), ConfigError> {
        self.band.validate(profile)?;
        if let Some(rule) = &self.rule {
            if !(rule.occupancy > 0.0 && rule.occupancy <= 1.0) {
                return Err(ConfigError::InvalidOccupancy {
                    profile,
                    occupancy: rule.occupancy,
                });
            }
        }
        if self.confirm_ticks == 0 {
            return Err(ConfigError::InvalidConfirmTicks { profile });
        }
        Ok(())
    }
}

/// Settings for every profile, keyed by profile
pub type ProfileTable = BTreeMap<ThreatProfile, ProfileSettings>;

/// Default settings for all profiles
pub fn default_profiles() -> ProfileTable {
    ThreatProfile::all()
        .into_iter()
        .map(|p| (p, ProfileSettings::for_profile(p)))
        .collect()
}
