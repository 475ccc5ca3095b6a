// src/core/session.rs
//
// Session state and the tick loop. Classification is pure; everything
// that mutates cross-tick state or reaches a collaborator happens in the
// effect stage of `tick`.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use serde::Serialize;
use uuid::Uuid;

use super::frame::Frame;
use super::history::FrameHistory;
use super::lock::{LockInfo, LockRecord, LockTracker, LockTransition};
use super::source::FrameSource;
use super::trigger::{Countermeasure, CountermeasureTrigger, TriggerEdge};
use crate::config::{ConfigError, SessionConfig, ThreatProfile};
use crate::detection::{Classification, Classifier, Debouncer, Detection, EventSink, SessionEvent};

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub sequence: u64,
    /// Whether the full pipeline ran on this tick
    pub analysed: bool,
    pub classification: Option<Classification>,
    pub detections: Vec<Detection>,
    pub events: Vec<SessionEvent>,
    /// Live frame, or the lock snapshot while locked
    pub display: Frame,
}

impl TickReport {
    /// Profiles confirmed on this tick
    pub fn confirmed(&self) -> Vec<ThreatProfile> {
        self.detections.iter().filter(|d| d.confirmed).map(|d| d.profile).collect()
    }
}

/// Counters and lock history for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub analysed_ticks: u64,
    /// Analysed ticks on which each profile was confirmed
    pub detections: BTreeMap<ThreatProfile, u64>,
    pub max_score: u32,
    pub locks_acquired: u64,
    pub countermeasure_activations: u64,
    pub sink_failures: u64,
    /// Most recent locks, oldest first; bounded by `lock_history`
    pub locks: VecDeque<LockRecord>,
}

impl SessionSummary {
    fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            stopped_at: None,
            ticks: 0,
            analysed_ticks: 0,
            detections: BTreeMap::new(),
            max_score: 0,
            locks_acquired: 0,
            countermeasure_activations: 0,
            sink_failures: 0,
            locks: VecDeque::new(),
        }
    }

    pub fn detection_count(&self, profile: ThreatProfile) -> u64 {
        self.detections.get(&profile).copied().unwrap_or(0)
    }
}

/// One capture session
///
/// Owns the frame history, the lock tracker, the countermeasure trigger and
/// the sink. Single-threaded: frames are processed to completion in order.
pub struct Session<S: EventSink, C: Countermeasure> {
    config: SessionConfig,
    classifier: Classifier,
    history: FrameHistory,
    debouncer: Debouncer,
    tracker: LockTracker,
    trigger: CountermeasureTrigger<C>,
    sink: S,
    summary: SessionSummary,
    bin_count: Option<usize>,
}

impl<S: EventSink, C: Countermeasure> Session<S, C> {
    /// Validate `config` and set up an idle session
    pub fn new(config: SessionConfig, sink: S, countermeasure: C) -> Result<Self, ConfigError> {
        config.validate()?;

        let id = Uuid::new_v4();
        info!(
            "Session {} started: stride {}, {:?} lock policy, profiles {:?}",
            id,
            config.stride,
            config.lock_policy,
            config.enabled_profiles()
        );

        Ok(Self {
            classifier: Classifier::new(&config),
            history: FrameHistory::new(config.features.history_len),
            debouncer: Debouncer::new(&config),
            tracker: LockTracker::new(&config),
            trigger: CountermeasureTrigger::new(countermeasure, config.countermeasure_profiles.clone()),
            sink,
            summary: SessionSummary::new(id),
            bin_count: None,
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.summary.session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }

    pub fn tracker(&self) -> &LockTracker {
        &self.tracker
    }

    pub fn is_locked(&self) -> bool {
        self.tracker.is_locked()
    }

    pub fn current_lock(&self) -> Option<&LockInfo> {
        self.tracker.current()
    }

    pub fn target_frequency(&self) -> Option<f32> {
        self.tracker.target_frequency()
    }

    pub fn countermeasure_active(&self) -> bool {
        self.trigger.is_active()
    }

    pub fn countermeasure(&self) -> &C {
        self.trigger.countermeasure()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn into_parts(self) -> (SessionSummary, S, C) {
        (self.summary, self.sink, self.trigger.into_inner())
    }

    /// Process one captured frame
    ///
    /// Every `stride`-th tick (starting with the first) runs the full
    /// pipeline and pushes the frame into the history. Other ticks only
    /// produce the display frame.
    pub fn tick(&mut self, frame: Frame) -> TickReport {
        let analysed = self.summary.ticks % self.config.stride as u64 == 0;
        self.summary.ticks += 1;

        if let Some(prev) = self.bin_count.replace(frame.bin_count()) {
            if prev != frame.bin_count() {
                warn!("Frame size changed from {} to {} bins", prev, frame.bin_count());
            }
        }

        if !analysed {
            trace!("Tick {} skipped by stride", frame.sequence());
            return TickReport {
                sequence: frame.sequence(),
                analysed: false,
                classification: None,
                detections: Vec::new(),
                events: Vec::new(),
                display: self.tracker.display_frame(&frame),
            };
        }

        // Pure stage
        let classification = self.classifier.classify(&frame, &self.history);
        self.history.push(frame.clone());
        trace!("Tick {} features: {:?}", frame.sequence(), classification.features);
        debug!(
            "Tick {}: primary score {} {:?}",
            frame.sequence(),
            classification.primary.score,
            classification.primary.triggered
        );

        // Effect stage
        let detections = self.debouncer.confirm(&classification.verdicts);
        let confirmed: Vec<ThreatProfile> =
            detections.iter().filter(|d| d.confirmed).map(|d| d.profile).collect();

        self.summary.analysed_ticks += 1;
        self.summary.max_score = self.summary.max_score.max(classification.primary.score);
        for profile in &confirmed {
            *self.summary.detections.entry(*profile).or_insert(0) += 1;
        }

        let mut events: Vec<SessionEvent> = detections
            .iter()
            .map(|d| SessionEvent::ScoreTick {
                profile: d.profile,
                score: d.score,
                detected: d.confirmed,
            })
            .collect();

        let transitions = self.tracker.update(&frame, &confirmed);
        events.extend(transitions.into_iter().map(|t| self.lock_event(t)));

        if let Some(edge) = self.trigger.update(&confirmed) {
            events.push(self.edge_event(edge));
        }

        self.dispatch(&events);

        TickReport {
            sequence: frame.sequence(),
            analysed: true,
            classification: Some(classification),
            detections,
            events,
            display: self.tracker.display_frame(&frame),
        }
    }

    /// Release one profile's lock; no-op if it is not held
    pub fn unlock(&mut self, profile: ThreatProfile) -> Vec<SessionEvent> {
        let events: Vec<SessionEvent> = self
            .tracker
            .unlock(profile)
            .into_iter()
            .map(|t| self.lock_event(t))
            .collect();
        self.dispatch(&events);
        events
    }

    /// Release every held lock
    pub fn unlock_all(&mut self) -> Vec<SessionEvent> {
        let transitions = self.tracker.unlock_all();
        let events: Vec<SessionEvent> = transitions.into_iter().map(|t| self.lock_event(t)).collect();
        self.dispatch(&events);
        events
    }

    /// Cancellation: discard the history, force-unlock, then
    /// force-deactivate the countermeasure
    ///
    /// Safe to call more than once.
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        self.history.clear();
        self.debouncer.reset();
        self.bin_count = None;

        let mut events: Vec<SessionEvent> = self
            .tracker
            .unlock_all()
            .into_iter()
            .map(|t| self.lock_event(t))
            .collect();
        if let Some(edge) = self.trigger.reset() {
            events.push(self.edge_event(edge));
        }
        self.dispatch(&events);

        if self.summary.stopped_at.is_none() {
            self.summary.stopped_at = Some(Utc::now());
            info!(
                "Session {} stopped after {} ticks ({} analysed)",
                self.summary.session_id, self.summary.ticks, self.summary.analysed_ticks
            );
        }
        events
    }

    /// Drain `source`, then stop
    pub fn run<F: FrameSource + ?Sized>(&mut self, source: &mut F) -> &SessionSummary {
        self.run_with(source, |_| {})
    }

    /// Drain `source`, handing every tick report to `on_tick`, then stop
    ///
    /// A capture error ends the stream like a clean end-of-stream.
    pub fn run_with<F, T>(&mut self, source: &mut F, mut on_tick: T) -> &SessionSummary
    where
        F: FrameSource + ?Sized,
        T: FnMut(&TickReport),
    {
        loop {
            match source.next_frame() {
                Ok(Some(frame)) => {
                    let report = self.tick(frame);
                    on_tick(&report);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Capture failed, ending session: {:#}", e);
                    break;
                }
            }
        }
        self.stop();
        &self.summary
    }

    fn lock_event(&mut self, transition: LockTransition) -> SessionEvent {
        match transition {
            LockTransition::Acquired(lock) => {
                info!(
                    "Locked {} at {:.1} Hz (bin {}, strength {:.0}%)",
                    lock.profile, lock.target_frequency_hz, lock.target_bin, lock.signal_strength
                );
                self.summary.locks_acquired += 1;
                self.summary.locks.push_back(lock.record());
                while self.summary.locks.len() > self.config.lock_history {
                    self.summary.locks.pop_front();
                }
                SessionEvent::LockAcquired {
                    profile: lock.profile,
                    frequency_hz: lock.target_frequency_hz,
                    timestamp: lock.locked_at,
                }
            }
            LockTransition::Released(lock) => {
                let now = Utc::now();
                info!(
                    "Released {} lock at {:.1} Hz after {:.2}s",
                    lock.profile,
                    lock.target_frequency_hz,
                    lock.elapsed().as_secs_f64()
                );
                if let Some(record) = self
                    .summary
                    .locks
                    .iter_mut()
                    .rev()
                    .find(|r| r.profile == lock.profile && r.released_at.is_none())
                {
                    record.released_at = Some(now);
                }
                SessionEvent::LockReleased {
                    profile: lock.profile,
                    timestamp: now,
                }
            }
            LockTransition::AllLocked(targets) => {
                info!("All {} profiles locked", targets.len());
                SessionEvent::AllLocked {
                    targets,
                    timestamp: Utc::now(),
                }
            }
        }
    }

    fn edge_event(&mut self, edge: TriggerEdge) -> SessionEvent {
        let timestamp = Utc::now();
        match edge {
            TriggerEdge::Rising(profile) => {
                info!("Countermeasure activated by {}", profile);
                self.summary.countermeasure_activations += 1;
                SessionEvent::CountermeasureActivated { profile, timestamp }
            }
            TriggerEdge::Falling => {
                info!("Countermeasure deactivated");
                SessionEvent::CountermeasureDeactivated { timestamp }
            }
        }
    }

    fn dispatch(&mut self, events: &[SessionEvent]) {
        for event in events {
            if let Err(e) = event.dispatch(&mut self.sink) {
                self.summary.sink_failures += 1;
                warn!("Event sink failed on {}: {:#}", event.name(), e);
            }
        }
    }
}
