//! Core analysis pipeline and session state

pub mod decoder;
pub mod dsp;
pub mod features;
pub mod frame;
pub mod history;
pub mod lock;
pub mod scorer;
pub mod session;
pub mod source;
pub mod trigger;

pub use dsp::{ByteSpectrumAnalyzer, WindowFunction};
pub use features::{FeatureExtractor, FeatureVector, Peak};
pub use frame::Frame;
pub use history::FrameHistory;
pub use lock::{LockInfo, LockRecord, LockTracker, LockTransition};
pub use scorer::{Heuristic, ProfileVerdict, ThreatScore, ThreatScorer};
pub use session::{Session, SessionSummary, TickReport};
pub use source::{AudioFileSource, FrameSource, IterSource};
pub use trigger::{
    Countermeasure, CountermeasureTrigger, LoggingCountermeasure, NullCountermeasure, TriggerEdge,
};
