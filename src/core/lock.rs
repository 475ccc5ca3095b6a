// src/core/lock.rs
//
// Lock/tracking state machine. A lock latches a detected profile onto the
// dominant bin of its band and freezes the frame it saw, until released
// explicitly.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::frame::Frame;
use crate::config::{FrequencyBand, HighlightConfig, LockPolicy, SessionConfig, ThreatProfile};

/// A held lock
#[derive(Debug, Clone, PartialEq)]
pub struct LockInfo {
    pub profile: ThreatProfile,
    pub target_bin: usize,
    pub target_frequency_hz: f32,
    /// Frame that was live when the lock was taken
    pub snapshot: Frame,
    pub locked_at: DateTime<Utc>,
    /// Snapshot mean amplitude, 0-100
    pub signal_strength: f32,
}

impl LockInfo {
    /// Wall-clock time since the lock was taken
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.locked_at).to_std().unwrap_or_default()
    }

    pub fn record(&self) -> LockRecord {
        LockRecord {
            profile: self.profile,
            target_frequency_hz: self.target_frequency_hz,
            signal_strength: self.signal_strength,
            locked_at: self.locked_at,
            released_at: None,
        }
    }
}

/// Serializable trace of one lock for summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockRecord {
    pub profile: ThreatProfile,
    pub target_frequency_hz: f32,
    pub signal_strength: f32,
    pub locked_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

/// State change produced by the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum LockTransition {
    Acquired(LockInfo),
    Released(LockInfo),
    /// Every lockable profile is held; fires once until one is released.
    /// Needs at least two enabled profiles
    AllLocked(Vec<(ThreatProfile, f32)>),
}

pub struct LockTracker {
    policy: LockPolicy,
    bands: BTreeMap<ThreatProfile, FrequencyBand>,
    lockable: Vec<ThreatProfile>,
    locks: BTreeMap<ThreatProfile, LockInfo>,
    all_locked_fired: bool,
    highlight: Option<HighlightConfig>,
}

impl LockTracker {
    pub fn new(config: &SessionConfig) -> Self {
        let lockable = config.enabled_profiles();
        let bands = lockable
            .iter()
            .filter_map(|p| config.profiles.get(p).map(|s| (*p, s.band)))
            .collect();

        Self {
            policy: config.lock_policy,
            bands,
            lockable,
            locks: BTreeMap::new(),
            all_locked_fired: false,
            highlight: config.highlight,
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    pub fn is_locked(&self) -> bool {
        !self.locks.is_empty()
    }

    pub fn is_profile_locked(&self, profile: ThreatProfile) -> bool {
        self.locks.contains_key(&profile)
    }

    /// Highest-priority held lock
    pub fn current(&self) -> Option<&LockInfo> {
        self.locks.values().min_by_key(|l| l.profile.priority())
    }

    pub fn lock_for(&self, profile: ThreatProfile) -> Option<&LockInfo> {
        self.locks.get(&profile)
    }

    pub fn locks(&self) -> impl Iterator<Item = &LockInfo> {
        self.locks.values()
    }

    /// Target of the current lock, `None` while unlocked
    pub fn target_frequency(&self) -> Option<f32> {
        self.current().map(|l| l.target_frequency_hz)
    }

    /// Take locks for detected profiles according to the policy
    ///
    /// Under `Single`, detections are ignored while any lock is held.
    pub fn update(&mut self, frame: &Frame, detected: &[ThreatProfile]) -> Vec<LockTransition> {
        let mut candidates: Vec<ThreatProfile> = detected
            .iter()
            .copied()
            .filter(|p| self.lockable.contains(p))
            .collect();
        candidates.sort_by_key(|p| p.priority());
        candidates.dedup();

        let mut transitions = Vec::new();
        match self.policy {
            LockPolicy::Single => {
                if !self.is_locked() {
                    if let Some(&profile) = candidates.first() {
                        transitions.push(LockTransition::Acquired(self.acquire(frame, profile)));
                    }
                }
            }
            LockPolicy::PerProfile => {
                for profile in candidates {
                    if !self.locks.contains_key(&profile) {
                        transitions.push(LockTransition::Acquired(self.acquire(frame, profile)));
                    }
                }
                if !self.all_locked_fired
                    && self.lockable.len() >= 2
                    && self.lockable.iter().all(|p| self.locks.contains_key(p))
                {
                    self.all_locked_fired = true;
                    let targets = self
                        .locks
                        .values()
                        .map(|l| (l.profile, l.target_frequency_hz))
                        .collect();
                    transitions.push(LockTransition::AllLocked(targets));
                }
            }
        }
        transitions
    }

    fn acquire(&mut self, frame: &Frame, profile: ThreatProfile) -> LockInfo {
        let whole = FrequencyBand::new(0.0, frame.nyquist());
        let target_bin = self
            .bands
            .get(&profile)
            .and_then(|band| frame.dominant_bin(band))
            .or_else(|| frame.dominant_bin(&whole))
            .unwrap_or(0);

        let info = LockInfo {
            profile,
            target_bin,
            target_frequency_hz: frame.bin_frequency(target_bin),
            snapshot: frame.clone(),
            locked_at: Utc::now(),
            signal_strength: frame.signal_strength(),
        };
        self.locks.insert(profile, info.clone());
        info
    }

    /// Release one profile's lock; no-op if it is not held
    pub fn unlock(&mut self, profile: ThreatProfile) -> Option<LockTransition> {
        let info = self.locks.remove(&profile)?;
        self.all_locked_fired = false;
        Some(LockTransition::Released(info))
    }

    /// Release every held lock, highest priority first
    pub fn unlock_all(&mut self) -> Vec<LockTransition> {
        let mut held: Vec<ThreatProfile> = self.locks.keys().copied().collect();
        held.sort_by_key(|p| p.priority());
        held.into_iter().filter_map(|p| self.unlock(p)).collect()
    }

    /// Frame to present downstream: the frozen snapshot while locked
    pub fn display_frame(&self, live: &Frame) -> Frame {
        match (self.current(), &self.highlight) {
            (Some(lock), Some(h)) => lock.snapshot.highlighted(lock.target_bin, h.radius_bins, h.gain),
            (Some(lock), None) => lock.snapshot.clone(),
            (None, _) => live.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    // 100 Hz per bin at 48 kHz
    fn frame_with_peaks(peaks: &[(usize, u8)], seq: u64) -> Frame {
        let mut bins = vec![10u8; 240];
        for &(i, a) in peaks {
            bins[i] = a;
        }
        Frame::new(bins, 48000, seq)
    }

    #[test]
    fn test_acquire_targets_dominant_bin_in_band() {
        let mut tracker = LockTracker::new(&SessionConfig::default());
        // Directed band 15-20 kHz: bins 150..200
        let frame = frame_with_peaks(&[(160, 230), (30, 255)], 0);
        let transitions = tracker.update(&frame, &[ThreatProfile::Directed]);

        assert_eq!(transitions.len(), 1);
        assert!(tracker.is_locked());
        assert_eq!(tracker.current().unwrap().target_bin, 160);
        assert_eq!(tracker.target_frequency(), Some(16000.0));
    }

    #[test]
    fn test_lock_latches_until_unlock() {
        let mut tracker = LockTracker::new(&SessionConfig::default());
        tracker.update(&frame_with_peaks(&[(40, 250)], 0), &[ThreatProfile::MidBandIntensity]);
        assert_eq!(tracker.target_frequency(), Some(4000.0));

        for seq in 1..10 {
            let frame = frame_with_peaks(&[(190, 255), (80, 255)], seq);
            let transitions = tracker.update(&frame, &[ThreatProfile::Directed, ThreatProfile::MidBandIntensity]);
            assert!(transitions.is_empty());
            assert_eq!(tracker.target_frequency(), Some(4000.0));
        }
    }

    #[test]
    fn test_unlock_clears_target() {
        let mut tracker = LockTracker::new(&SessionConfig::default());
        tracker.update(&frame_with_peaks(&[(40, 250)], 0), &[ThreatProfile::MidBandIntensity]);

        let released = tracker.unlock(ThreatProfile::MidBandIntensity);
        assert!(matches!(released, Some(LockTransition::Released(_))));
        assert!(!tracker.is_locked());
        assert_eq!(tracker.target_frequency(), None);

        // Second unlock is a no-op
        assert!(tracker.unlock(ThreatProfile::MidBandIntensity).is_none());
    }

    #[test]
    fn test_single_policy_prefers_priority() {
        let mut tracker = LockTracker::new(&SessionConfig::default());
        let frame = frame_with_peaks(&[(40, 250), (170, 240)], 0);
        tracker.update(
            &frame,
            &[ThreatProfile::HighFrequencyBurst, ThreatProfile::MidBandIntensity, ThreatProfile::Directed],
        );
        assert_eq!(tracker.current().unwrap().profile, ThreatProfile::Directed);
        assert_eq!(tracker.locks().count(), 1);
    }

    #[test]
    fn test_empty_band_falls_back_to_whole_frame() {
        let mut tracker = LockTracker::new(&SessionConfig::default());
        // 8 kHz sample rate: the directed band lies above Nyquist
        let mut bins = vec![0u8; 64];
        bins[12] = 200;
        let frame = Frame::new(bins, 8000, 0);
        tracker.update(&frame, &[ThreatProfile::Directed]);
        assert_eq!(tracker.current().unwrap().target_bin, 12);
    }

    #[test]
    fn test_per_profile_all_locked_fires_once() {
        let config = ConfigBuilder::new().lock_policy(LockPolicy::PerProfile).build().unwrap();
        let mut tracker = LockTracker::new(&config);
        let frame = frame_with_peaks(&[(40, 250), (170, 240), (210, 230)], 0);

        let t = tracker.update(&frame, &[ThreatProfile::Directed, ThreatProfile::MidBandIntensity]);
        assert_eq!(t.len(), 2);

        let t = tracker.update(&frame, &ThreatProfile::all());
        assert_eq!(t.len(), 2);
        assert!(matches!(&t[1], LockTransition::AllLocked(targets) if targets.len() == 3));

        assert!(tracker.update(&frame, &ThreatProfile::all()).is_empty());

        // Releasing one re-arms the combined event
        tracker.unlock(ThreatProfile::Directed);
        let t = tracker.update(&frame, &[ThreatProfile::Directed]);
        assert_eq!(t.len(), 2);
        assert!(matches!(t[1], LockTransition::AllLocked(_)));
    }

    #[test]
    fn test_display_frame_is_snapshot_while_locked() {
        let config = ConfigBuilder::new().highlight(1, 2.0).build().unwrap();
        let mut tracker = LockTracker::new(&config);
        let locked = frame_with_peaks(&[(40, 100)], 0);
        let live = frame_with_peaks(&[(90, 255)], 1);

        assert_eq!(tracker.display_frame(&live), live);

        tracker.update(&locked, &[ThreatProfile::MidBandIntensity]);
        let shown = tracker.display_frame(&live);
        assert_eq!(shown.sequence(), 0);
        assert_eq!(shown.amplitudes()[40], 200);
        assert_eq!(shown.amplitudes()[39], 20);
        assert_eq!(shown.amplitudes()[90], 10);

        tracker.unlock_all();
        assert_eq!(tracker.display_frame(&live), live);
    }

    #[test]
    fn test_all_locked_skipped_with_one_profile() {
        let config = ConfigBuilder::new()
            .lock_policy(LockPolicy::PerProfile)
            .disable(ThreatProfile::MidBandIntensity)
            .disable(ThreatProfile::HighFrequencyBurst)
            .build()
            .unwrap();
        let mut tracker = LockTracker::new(&config);
        let transitions = tracker.update(&frame_with_peaks(&[(160, 200)], 0), &[ThreatProfile::Directed]);
        assert_eq!(transitions.len(), 1);
        assert!(matches!(transitions[0], LockTransition::Acquired(_)));
    }

    #[test]
    fn test_disabled_profile_never_locks() {
        let config = ConfigBuilder::new().disable(ThreatProfile::Directed).build().unwrap();
        let mut tracker = LockTracker::new(&config);
        assert!(tracker.update(&frame_with_peaks(&[], 0), &[ThreatProfile::Directed]).is_empty());
    }
}
