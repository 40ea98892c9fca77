//! An in-memory experiment backend.
//!
//! Mirrors the server's behaviour closely enough to exercise the coordinator:
//! captures land in the experiment selected on the *server* side, entries are
//! looked up per experiment, and the live endpoint produces a slowly drifting
//! reading. Failures and latency can be injected per endpoint, and every
//! endpoint counts its calls.

use super::{paths, Backend};
use crate::error::{AppResult, MonitorError};
use crate::experiment::{
    CaptureReceipt, DataEntry, EntryId, Experiment, ExperimentId, LiveReading, NewExperiment,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct MockState {
    experiments: Vec<Experiment>,
    selected: Option<ExperimentId>,
    next_id: u64,
}

impl MockState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory [`Backend`] with call counters and injectable failures.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    capture_calls: AtomicUsize,
    entry_calls: AtomicUsize,
    live_calls: AtomicUsize,
    capture_failing: AtomicBool,
    entry_failing: AtomicBool,
    live_failures_remaining: AtomicUsize,
    entry_delay_ms: AtomicU64,
    live_delay_ms: AtomicU64,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an experiment. Ids of seeded experiments should be numeric so
    /// they do not collide with allocated ones.
    pub fn with_experiment(mut self, experiment: Experiment) -> Self {
        let state = self.state.get_mut();
        if let Ok(n) = experiment.id.as_str().parse::<u64>() {
            state.next_id = state.next_id.max(n);
        }
        state.experiments.push(experiment);
        self
    }

    /// Make every capture trigger fail with a 500 until cleared.
    pub fn set_capture_failing(&self, failing: bool) {
        self.capture_failing.store(failing, Ordering::SeqCst);
    }

    /// Make every entry lookup fail with a 500 until cleared.
    pub fn set_entry_failing(&self, failing: bool) {
        self.entry_failing.store(failing, Ordering::SeqCst);
    }

    /// Fail the next `count` live reads with a 503.
    pub fn fail_next_live_reads(&self, count: usize) {
        self.live_failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Latency added to every entry lookup.
    pub fn set_entry_delay(&self, delay: Duration) {
        self.entry_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Latency added to every live read.
    pub fn set_live_delay(&self, delay: Duration) {
        self.live_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    pub fn entry_calls(&self) -> usize {
        self.entry_calls.load(Ordering::SeqCst)
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    /// Experiment the server currently attributes captures to.
    pub async fn server_selection(&self) -> Option<ExperimentId> {
        self.state.lock().await.selected.clone()
    }

    /// Entries the server holds for `id`, newest last.
    pub async fn server_entries(&self, id: &ExperimentId) -> Vec<DataEntry> {
        let state = self.state.lock().await;
        state
            .experiments
            .iter()
            .find(|e| &e.id == id)
            .and_then(|e| e.data_entries.clone())
            .unwrap_or_default()
    }

    async fn delay(millis: &AtomicU64) {
        let ms = millis.load(Ordering::SeqCst);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn not_found(method: &'static str, path: String) -> MonitorError {
        MonitorError::Status {
            method,
            path,
            status: 404,
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_experiments(&self) -> AppResult<Vec<Experiment>> {
        Ok(self.state.lock().await.experiments.clone())
    }

    async fn create_experiment(&self, new: &NewExperiment) -> AppResult<Experiment> {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let experiment = Experiment {
            id: ExperimentId::new(id.to_string()),
            name: new.name.clone(),
            description: new.description.clone(),
            data_entries: Some(Vec::new()),
        };
        state.experiments.push(experiment.clone());
        Ok(experiment)
    }

    async fn delete_experiment(&self, id: &ExperimentId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let before = state.experiments.len();
        state.experiments.retain(|e| &e.id != id);
        if state.experiments.len() == before {
            return Err(Self::not_found("DELETE", paths::experiment(id)));
        }
        if state.selected.as_ref() == Some(id) {
            state.selected = None;
        }
        Ok(())
    }

    async fn select_experiment(&self, id: &ExperimentId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.experiments.iter().any(|e| &e.id == id) {
            return Err(Self::not_found("POST", paths::select(id)));
        }
        state.selected = Some(id.clone());
        Ok(())
    }

    async fn export_experiment(&self, id: &ExperimentId) -> AppResult<Bytes> {
        let state = self.state.lock().await;
        let experiment = state
            .experiments
            .iter()
            .find(|e| &e.id == id)
            .ok_or_else(|| Self::not_found("GET", paths::export(id)))?;
        let body = serde_json::to_vec(experiment).map_err(|source| MonitorError::Decode {
            path: paths::export(id),
            source,
        })?;
        Ok(Bytes::from(body))
    }

    async fn trigger_capture(&self) -> AppResult<CaptureReceipt> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        if self.capture_failing.load(Ordering::SeqCst) {
            return Err(MonitorError::Status {
                method: "POST",
                path: paths::CAPTURE.to_string(),
                status: 500,
            });
        }

        let mut state = self.state.lock().await;
        let id = EntryId::new(state.allocate_id().to_string());
        let target = state.selected.clone();
        let entry = DataEntry {
            id: id.clone(),
            timestamp: Utc::now(),
            temperature: Some(21.0),
            humidity: Some(48.5),
            experiment_id: target.clone(),
            image_filename: Some(format!("droplet_{id}.jpg")),
        };
        if let Some(experiment) = state
            .experiments
            .iter_mut()
            .find(|e| Some(&e.id) == target.as_ref())
        {
            experiment.data_entries.get_or_insert_with(Vec::new).push(entry);
        }
        Ok(CaptureReceipt { id })
    }

    async fn fetch_entry(
        &self,
        experiment: &ExperimentId,
        entry: &EntryId,
    ) -> AppResult<DataEntry> {
        self.entry_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.entry_delay_ms).await;
        if self.entry_failing.load(Ordering::SeqCst) {
            return Err(MonitorError::Status {
                method: "GET",
                path: paths::entry(experiment, entry),
                status: 500,
            });
        }

        let state = self.state.lock().await;
        state
            .experiments
            .iter()
            .find(|e| &e.id == experiment)
            .and_then(|e| e.data_entries.as_ref())
            .and_then(|entries| entries.iter().find(|d| &d.id == entry))
            .cloned()
            .ok_or_else(|| Self::not_found("GET", paths::entry(experiment, entry)))
    }

    async fn fetch_live_reading(&self) -> AppResult<LiveReading> {
        let call = self.live_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.live_delay_ms).await;

        let failed = self
            .live_failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(MonitorError::Status {
                method: "GET",
                path: paths::LIVE.to_string(),
                status: 503,
            });
        }

        let phase = call as f64 * 0.1;
        Ok(LiveReading {
            temperature: 21.0 + phase.sin(),
            humidity: 45.0 + 2.0 * phase.cos(),
        })
    }
}
