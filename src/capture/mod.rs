//! Sensor captures
//!
//! - **scheduler**: capture on/off state and cadence (instant or repeating)
//! - **correlator**: resolves a capture's result id to the full data entry
//!   and merges it into the experiment store
//!
//! Every scheduled capture is independent: a failed tick is logged and the
//! next tick fires on time regardless.

pub mod correlator;
pub mod scheduler;

pub use correlator::{CaptureCorrelator, Correlation};
pub use scheduler::{interval_label, CaptureScheduler};
