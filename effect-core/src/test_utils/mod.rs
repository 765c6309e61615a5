//! Test doubles for handlers and effect sources.
//!
//! Available behind the `test-utils` feature flag.

mod drop_probe;
mod recording_handler;

pub use drop_probe::{DropGuard, DropProbe, probed};
pub use recording_handler::RecordingHandler;
