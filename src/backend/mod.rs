//! Experiment backend clients
//!
//! The backend is an external REST service. This module defines the
//! [`Backend`] trait the coordinator talks to and its implementations:
//!
//! - [`HttpBackend`]: JSON over HTTP with `reqwest`
//! - [`MockBackend`]: in-memory backend with scriptable failures and delays,
//!   used by tests and offline demos

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

use crate::error::AppResult;
use crate::experiment::{
    CaptureReceipt, DataEntry, EntryId, Experiment, ExperimentId, LiveReading, NewExperiment,
};
use async_trait::async_trait;
use bytes::Bytes;

/// Request paths of the backend REST surface.
pub mod paths {
    use crate::experiment::{EntryId, ExperimentId};

    pub const EXPERIMENTS: &str = "/api/experiments";
    pub const CAPTURE: &str = "/api/data/capture";
    pub const LIVE: &str = "/api/data";

    pub fn experiment(id: &ExperimentId) -> String {
        format!("/api/experiments/{id}")
    }

    pub fn select(id: &ExperimentId) -> String {
        format!("/api/experiments/select/{id}")
    }

    pub fn export(id: &ExperimentId) -> String {
        format!("/api/experiments/{id}/export")
    }

    pub fn entry(experiment: &ExperimentId, entry: &EntryId) -> String {
        format!("/api/experiments/{experiment}/data/{entry}")
    }
}

/// Operations the monitor needs from the experiment backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All experiments, with their entries.
    async fn list_experiments(&self) -> AppResult<Vec<Experiment>>;

    async fn create_experiment(&self, new: &NewExperiment) -> AppResult<Experiment>;

    async fn delete_experiment(&self, id: &ExperimentId) -> AppResult<()>;

    /// Tell the backend which experiment new captures belong to.
    async fn select_experiment(&self, id: &ExperimentId) -> AppResult<()>;

    /// Archive of an experiment's entries and images.
    async fn export_experiment(&self, id: &ExperimentId) -> AppResult<Bytes>;

    /// Ask the station to capture now. The backend picks the target
    /// experiment; the receipt carries the new entry's id.
    async fn trigger_capture(&self) -> AppResult<CaptureReceipt>;

    async fn fetch_entry(&self, experiment: &ExperimentId, entry: &EntryId)
        -> AppResult<DataEntry>;

    /// Current, unpersisted sensor reading.
    async fn fetch_live_reading(&self) -> AppResult<LiveReading>;
}
