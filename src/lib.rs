//! SpectralGuard - Streaming spectral threat-profile classifier
//!
//! Consumes a stream of byte-amplitude spectra, classifies each analysed
//! frame against a small set of threat profiles, and latches a frequency
//! lock on the first profile that fires so reports can refer to a stable
//! target.
//!
//! ## Features
//!
//! - **Weighted primary score**: eight spectral heuristics (flux, centroid,
//!   flatness, rolloff, harmonic ratios, temporal correlation, high-band
//!   energy, modulation) summed against a tunable threshold
//! - **Band-occupancy profiles**: mid-band intensity and high-frequency
//!   bursts, with optional multi-tick confirmation
//! - **Lock tracking**: single aggregate lock or independent per-profile
//!   locks with a combined all-locked event
//! - **Edge-triggered countermeasure**: one activate per rising edge, one
//!   deactivate per falling edge
//! - **Pluggable sinks**: log, in-memory recording, JSON lines
//!
//! ## Module Structure
//!
//! - `core` - Frames, history, features, scoring, locks, trigger, session
//! - `config` - Profiles, thresholds and session configuration
//! - `detection` - Classification stage, session events and sinks
//! - `cli` - Command-line interface
//! - `testgen` - Synthetic frames and WAV generation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spectralguard::config::SessionConfig;
//! use spectralguard::core::{AudioFileSource, NullCountermeasure, Session};
//! use spectralguard::detection::RecordingSink;
//!
//! let mut source = AudioFileSource::open(path, 8192)?;
//! let mut session = Session::new(SessionConfig::default(), RecordingSink::new(), NullCountermeasure)?;
//! let summary = session.run(&mut source);
//!
//! println!("Locks acquired: {}", summary.locks_acquired);
//! ```
//!
//! ## Threat Profiles
//!
//! | Profile              | Rule                                   | Default band |
//! |----------------------|----------------------------------------|--------------|
//! | directed             | Weighted score >= 8                    | 15-20 kHz    |
//! | mid_band_intensity   | >30% of bins above 200                 | 2-10 kHz     |
//! | high_frequency_burst | >5% of bins above 200, 5 ticks running | 18-24 kHz    |

// Core analysis pipeline
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and profiles
pub mod config;

// Classification stage and event sinks
pub mod detection;

// Synthetic test signals
pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigBuilder, ConfigError, LockPolicy, SessionConfig, ThreatProfile};
pub use detection::{Classification, Classifier, EventSink, SessionEvent};
pub use core::{
    Frame, FrameHistory, FrameSource, FeatureVector, LockInfo, Session, SessionSummary,
    ThreatScore, TickReport,
};
