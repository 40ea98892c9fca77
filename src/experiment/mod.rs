//! Experiments and their captured data
//!
//! - **model**: the wire types exchanged with the backend (`Experiment`,
//!   `DataEntry`, `LiveReading`, ...) and the transient `LiveTelemetryPoint`.
//! - **store**: the client-side experiment collection, selection pointer and
//!   the most recently captured entry.
//!
//! The store is the single owner of `DataEntry` records on the client. The
//! live telemetry subsystem never writes to it.

pub mod model;
pub mod store;

pub use model::{
    CaptureReceipt, DataEntry, EntryId, Experiment, ExperimentId, LiveReading,
    LiveTelemetryPoint, NewExperiment,
};
pub use store::{ExperimentStore, SharedStore};
