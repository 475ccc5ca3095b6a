// src/core/trigger.rs
//
// Edge-triggered countermeasure control. The session feeds one boolean per
// analysed tick; only transitions reach the external collaborator.

use log::info;

use crate::config::ThreatProfile;

/// External neutralization routine
///
/// Both calls must tolerate being made redundantly.
pub trait Countermeasure {
    fn activate(&mut self, profile: ThreatProfile);
    fn deactivate(&mut self);
}

/// Countermeasure that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCountermeasure;

impl Countermeasure for NullCountermeasure {
    fn activate(&mut self, _profile: ThreatProfile) {}
    fn deactivate(&mut self) {}
}

/// Countermeasure that only logs its edges
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCountermeasure;

impl Countermeasure for LoggingCountermeasure {
    fn activate(&mut self, profile: ThreatProfile) {
        info!("Countermeasure engaged against {}", profile);
    }

    fn deactivate(&mut self) {
        info!("Countermeasure disengaged");
    }
}

/// Edge reported by the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising(ThreatProfile),
    Falling,
}

/// Rising/falling edge detector in front of a [`Countermeasure`]
pub struct CountermeasureTrigger<C: Countermeasure> {
    countermeasure: C,
    eligible: Vec<ThreatProfile>,
    active: bool,
    activations: u64,
}

impl<C: Countermeasure> CountermeasureTrigger<C> {
    pub fn new(countermeasure: C, eligible: Vec<ThreatProfile>) -> Self {
        Self {
            countermeasure,
            eligible,
            active: false,
            activations: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    pub fn eligible(&self) -> &[ThreatProfile] {
        &self.eligible
    }

    pub fn countermeasure(&self) -> &C {
        &self.countermeasure
    }

    pub fn into_inner(self) -> C {
        self.countermeasure
    }

    /// Feed the detected profiles of one tick
    ///
    /// The signal is the OR over eligible profiles. The first eligible
    /// detection in `detected` order names the profile on a rising edge.
    pub fn update(&mut self, detected: &[ThreatProfile]) -> Option<TriggerEdge> {
        let hit = detected.iter().copied().find(|p| self.eligible.contains(p));
        match (self.active, hit) {
            (false, Some(profile)) => {
                self.active = true;
                self.activations += 1;
                self.countermeasure.activate(profile);
                Some(TriggerEdge::Rising(profile))
            }
            (true, None) => Some(self.force_deactivate()),
            _ => None,
        }
    }

    /// Drop the signal low regardless of input
    ///
    /// Returns the falling edge, or `None` if already inactive.
    pub fn reset(&mut self) -> Option<TriggerEdge> {
        if self.active {
            Some(self.force_deactivate())
        } else {
            None
        }
    }

    fn force_deactivate(&mut self) -> TriggerEdge {
        self.active = false;
        self.countermeasure.deactivate();
        TriggerEdge::Falling
    }
}
