//! Detection module for SpectralGuard
//!
//! The pure classification stage and the event objects handed to sinks.

mod classification;
mod events;
mod sink;

pub use classification::{Classification, Classifier, Debouncer, Detection};
pub use events::SessionEvent;
pub use sink::{EventSink, JsonLinesSink, LogSink, RecordingSink};
