//! Common test utilities for droplet-monitor integration tests
//!
//! This module provides reusable test helpers for:
//! - Experiment fixtures
//! - A session wired to the in-memory backend, view state and chart sink
//! - Letting spawned tasks run under paused time

#![allow(dead_code)] // Utilities may not all be used by every test file

use droplet_monitor::{
    backend::MockBackend,
    charts::RecordingChartSink,
    config::Settings,
    experiment::{Experiment, ExperimentId},
    view::SharedViewState,
    MonitorSession,
};
use std::sync::Arc;
use std::time::Duration;

/// Experiment with an empty (but present) entry list.
pub fn experiment(id: &str, name: &str) -> Experiment {
    Experiment {
        id: ExperimentId::new(id),
        name: name.to_string(),
        description: format!("{name} description"),
        data_entries: Some(Vec::new()),
    }
}

/// A session and handles on every collaborator it talks to.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub view: Arc<SharedViewState>,
    pub sink: Arc<RecordingChartSink>,
    pub settings: Settings,
    pub session: MonitorSession,
}

/// Session over a backend seeded with experiments "1" and "2".
pub fn harness() -> Harness {
    harness_with(Settings::default())
}

pub fn harness_with(settings: Settings) -> Harness {
    let backend = Arc::new(
        MockBackend::new()
            .with_experiment(experiment("1", "Evaporation"))
            .with_experiment(experiment("2", "Condensation")),
    );
    let view = Arc::new(SharedViewState::new(settings.live.live_view_index));
    let sink = Arc::new(RecordingChartSink::new());
    let session = MonitorSession::new(&settings, backend.clone(), view.clone(), sink.clone());
    Harness {
        backend,
        view,
        sink,
        settings,
        session,
    }
}

impl Harness {
    /// Load experiments and select `id` on both sides.
    pub async fn select(&self, id: &str) {
        self.session.refresh_experiments().await.unwrap();
        self.session
            .select_experiment(ExperimentId::new(id))
            .await
            .unwrap();
    }

    /// Mount both chart targets, as a rendered live view would.
    pub fn mount_charts(&self) {
        self.view.mount(self.settings.live.temperature_mount.clone());
        self.view.mount(self.settings.live.humidity_mount.clone());
    }

    /// Entry count of experiment `id` in the client store.
    pub async fn local_entries(&self, id: &str) -> usize {
        self.session
            .store()
            .read()
            .await
            .get(&ExperimentId::new(id))
            .and_then(|e| e.data_entries.as_ref())
            .map_or(0, Vec::len)
    }
}

/// Let already-spawned tasks run to completion without crossing any
/// scheduled timer of interest.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
