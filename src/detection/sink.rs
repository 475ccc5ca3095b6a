//! Event sink boundary and the stock sinks

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::events::SessionEvent;
use crate::config::ThreatProfile;

/// Receiver of classification and lock-state reports
///
/// Calls are fire-and-forget. An `Err` is logged by the session and the
/// tick carries on; the sink owns any retry or durability.
pub trait EventSink {
    fn on_lock_acquired(&mut self, profile: ThreatProfile, frequency_hz: f32, timestamp: DateTime<Utc>) -> Result<()>;

    fn on_lock_released(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()>;

    fn on_score_tick(&mut self, profile: ThreatProfile, score: u32, detected: bool) -> Result<()>;

    fn on_all_locked(&mut self, _targets: &[(ThreatProfile, f32)], _timestamp: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    fn on_countermeasure_activated(&mut self, _profile: ThreatProfile, _timestamp: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    fn on_countermeasure_deactivated(&mut self, _timestamp: DateTime<Utc>) -> Result<()> {
        Ok(())
    }
}

/// Writes events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_lock_acquired(&mut self, profile: ThreatProfile, frequency_hz: f32, timestamp: DateTime<Utc>) -> Result<()> {
        info!("[{}] {} locked at {:.1} Hz", timestamp.format("%H:%M:%S%.3f"), profile, frequency_hz);
        Ok(())
    }

    fn on_lock_released(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()> {
        info!("[{}] {} lock released", timestamp.format("%H:%M:%S%.3f"), profile);
        Ok(())
    }

    fn on_score_tick(&mut self, profile: ThreatProfile, score: u32, detected: bool) -> Result<()> {
        debug!("{}: score={} detected={}", profile, score, detected);
        Ok(())
    }

    fn on_all_locked(&mut self, targets: &[(ThreatProfile, f32)], timestamp: DateTime<Utc>) -> Result<()> {
        let list: Vec<String> = targets.iter().map(|(p, f)| format!("{} @ {:.1} Hz", p, f)).collect();
        warn!("[{}] All threat profiles locked: {}", timestamp.format("%H:%M:%S%.3f"), list.join(", "));
        Ok(())
    }
}

/// Keeps every event in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<SessionEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events of one kind, by [`SessionEvent::name`]
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingSink {
    fn on_lock_acquired(&mut self, profile: ThreatProfile, frequency_hz: f32, timestamp: DateTime<Utc>) -> Result<()> {
        self.events.push(SessionEvent::LockAcquired { profile, frequency_hz, timestamp });
        Ok(())
    }

    fn on_lock_released(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()> {
        self.events.push(SessionEvent::LockReleased { profile, timestamp });
        Ok(())
    }

    fn on_score_tick(&mut self, profile: ThreatProfile, score: u32, detected: bool) -> Result<()> {
        self.events.push(SessionEvent::ScoreTick { profile, score, detected });
        Ok(())
    }

    fn on_all_locked(&mut self, targets: &[(ThreatProfile, f32)], timestamp: DateTime<Utc>) -> Result<()> {
        self.events.push(SessionEvent::AllLocked { targets: targets.to_vec(), timestamp });
        Ok(())
    }

    fn on_countermeasure_activated(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()> {
        self.events.push(SessionEvent::CountermeasureActivated { profile, timestamp });
        Ok(())
    }

    fn on_countermeasure_deactivated(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        self.events.push(SessionEvent::CountermeasureDeactivated { timestamp });
        Ok(())
    }
}

/// One JSON object per line
///
/// Score ticks are skipped unless `with_score_ticks` is set.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    score_ticks: bool,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, score_ticks: false }
    }

    pub fn with_score_ticks(mut self, enabled: bool) -> Self {
        self.score_ticks = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, event: &SessionEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)
            .with_context(|| format!("Failed to serialize {} event", event.name()))?;
        self.writer.write_all(b"\n").context("Failed to write event line")?;
        Ok(())
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn on_lock_acquired(&mut self, profile: ThreatProfile, frequency_hz: f32, timestamp: DateTime<Utc>) -> Result<()> {
        self.write(&SessionEvent::LockAcquired { profile, frequency_hz, timestamp })
    }

    fn on_lock_released(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()> {
        self.write(&SessionEvent::LockReleased { profile, timestamp })
    }

    fn on_score_tick(&mut self, profile: ThreatProfile, score: u32, detected: bool) -> Result<()> {
        if !self.score_ticks {
            return Ok(());
        }
        self.write(&SessionEvent::ScoreTick { profile, score, detected })
    }

    fn on_all_locked(&mut self, targets: &[(ThreatProfile, f32)], timestamp: DateTime<Utc>) -> Result<()> {
        self.write(&SessionEvent::AllLocked { targets: targets.to_vec(), timestamp })
    }

    fn on_countermeasure_activated(&mut self, profile: ThreatProfile, timestamp: DateTime<Utc>) -> Result<()> {
        self.write(&SessionEvent::CountermeasureActivated { profile, timestamp })
    }

    fn on_countermeasure_deactivated(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        self.write(&SessionEvent::CountermeasureDeactivated { timestamp })
    }
}
