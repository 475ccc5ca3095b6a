//! Event objects passed from the session to its sink

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sink::EventSink;
use crate::config::ThreatProfile;

/// One state change or report produced by a session tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    ScoreTick {
        profile: ThreatProfile,
        score: u32,
        detected: bool,
    },
    LockAcquired {
        profile: ThreatProfile,
        frequency_hz: f32,
        timestamp: DateTime<Utc>,
    },
    LockReleased {
        profile: ThreatProfile,
        timestamp: DateTime<Utc>,
    },
    /// Every lockable profile is held at once
    AllLocked {
        targets: Vec<(ThreatProfile, f32)>,
        timestamp: DateTime<Utc>,
    },
    CountermeasureActivated {
        profile: ThreatProfile,
        timestamp: DateTime<Utc>,
    },
    CountermeasureDeactivated {
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::ScoreTick { .. } => "score_tick",
            SessionEvent::LockAcquired { .. } => "lock_acquired",
            SessionEvent::LockReleased { .. } => "lock_released",
            SessionEvent::AllLocked { .. } => "all_locked",
            SessionEvent::CountermeasureActivated { .. } => "countermeasure_activated",
            SessionEvent::CountermeasureDeactivated { .. } => "countermeasure_deactivated",
        }
    }

    /// Hand the event to the matching sink callback
    pub fn dispatch<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        match self {
            SessionEvent::ScoreTick { profile, score, detected } => {
                sink.on_score_tick(*profile, *score, *detected)
            }
            SessionEvent::LockAcquired { profile, frequency_hz, timestamp } => {
                sink.on_lock_acquired(*profile, *frequency_hz, *timestamp)
            }
            SessionEvent::LockReleased { profile, timestamp } => {
                sink.on_lock_released(*profile, *timestamp)
            }
            SessionEvent::AllLocked { targets, timestamp } => sink.on_all_locked(targets, *timestamp),
            SessionEvent::CountermeasureActivated { profile, timestamp } => {
                sink.on_countermeasure_activated(*profile, *timestamp)
            }
            SessionEvent::CountermeasureDeactivated { timestamp } => {
                sink.on_countermeasure_deactivated(*timestamp)
            }
        }
    }
}
