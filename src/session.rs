//! Monitor session
//!
//! A `MonitorSession` lives as long as the operator's view. It owns the
//! experiment store, the capture scheduler and the live telemetry poller,
//! and exposes the plain request/response experiment operations (list,
//! create, select, delete, export).
//!
//! Teardown stops the capture timer unconditionally and cancels every
//! readiness wait and poll loop started by the session. Dropping the session
//! tears it down.

use crate::backend::Backend;
use crate::capture::{CaptureCorrelator, CaptureScheduler, Correlation};
use crate::charts::{ChartSink, TelemetryCharts};
use crate::config::Settings;
use crate::error::{AppResult, MonitorError};
use crate::experiment::{Experiment, ExperimentId, ExperimentStore, NewExperiment, SharedStore};
use crate::live::{LivePoller, ViewChangeDispatcher};
use crate::readiness::{ensure_all_ready, Readiness};
use crate::view::SharedViewState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Everything one operator view needs, wired together.
pub struct MonitorSession {
    backend: Arc<dyn Backend>,
    store: SharedStore,
    view: Arc<SharedViewState>,
    sink: Arc<dyn ChartSink>,
    charts: TelemetryCharts,
    correlator: Arc<CaptureCorrelator>,
    scheduler: CaptureScheduler,
    poller: LivePoller,
    dispatcher: ViewChangeDispatcher,
    readiness_retry: Duration,
    export_dir: PathBuf,
    cancel: CancellationToken,
}

impl MonitorSession {
    pub fn new(
        settings: &Settings,
        backend: Arc<dyn Backend>,
        view: Arc<SharedViewState>,
        sink: Arc<dyn ChartSink>,
    ) -> Self {
        let store = ExperimentStore::new().shared();
        let charts = TelemetryCharts::new(
            settings.live.temperature_mount.clone(),
            settings.live.humidity_mount.clone(),
        );
        let correlator = Arc::new(CaptureCorrelator::new(
            Arc::clone(&backend),
            Arc::clone(&store),
        ));
        let scheduler = CaptureScheduler::new(
            Arc::clone(&correlator),
            settings.capture.interval_secs,
            settings.capture.max_interval_secs,
        );
        let poller = LivePoller::new(
            Arc::clone(&backend),
            view.clone(),
            Arc::clone(&sink),
            charts.clone(),
            settings.live.poll_period(),
        );
        let cancel = CancellationToken::new();
        let dispatcher = ViewChangeDispatcher::new(
            poller.clone(),
            settings.live.live_view_index,
            cancel.clone(),
        );

        Self {
            backend,
            store,
            view,
            sink,
            charts,
            correlator,
            scheduler,
            poller,
            dispatcher,
            readiness_retry: settings.live.readiness_retry(),
            export_dir: settings.export.output_dir.clone(),
            cancel,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn view(&self) -> &Arc<SharedViewState> {
        &self.view
    }

    pub fn poller(&self) -> &LivePoller {
        &self.poller
    }

    pub fn scheduler(&self) -> &CaptureScheduler {
        &self.scheduler
    }

    /// Wait for both chart mount points, then create the charts.
    pub async fn init_charts(&self) -> Readiness {
        let readiness = ensure_all_ready(
            self.view.as_ref(),
            &self.charts.mount_points(),
            self.readiness_retry,
            &self.cancel,
        )
        .await;
        if readiness.is_ready() {
            self.charts.initialize(self.sink.as_ref());
        }
        readiness
    }

    // =========================================================================
    // Experiments
    // =========================================================================

    /// Reload the experiment list from the backend. Returns the count.
    pub async fn refresh_experiments(&self) -> AppResult<usize> {
        let experiments = self.backend.list_experiments().await.map_err(|e| {
            error!("Failed to list experiments: {}", e);
            e
        })?;
        let count = experiments.len();
        self.store.write().await.replace_all(experiments);
        info!("Loaded {} experiments", count);
        Ok(count)
    }

    /// Create an experiment and select it.
    pub async fn create_experiment(
        &self,
        name: &str,
        description: Option<String>,
    ) -> AppResult<Experiment> {
        let experiment = self
            .backend
            .create_experiment(&NewExperiment::new(name, description))
            .await
            .map_err(|e| {
                error!("Error creating experiment: {}", e);
                e
            })?;
        info!("Created experiment {} ({})", experiment.id, experiment.name);
        self.store.write().await.insert(experiment.clone());
        self.select_experiment(experiment.id.clone()).await?;
        Ok(experiment)
    }

    /// Select an experiment locally and tell the backend so new captures
    /// land in it. The local selection holds even if the notification fails.
    pub async fn select_experiment(&self, id: ExperimentId) -> AppResult<()> {
        info!("Experiment selected: {}", id);
        self.store.write().await.select(id.clone());
        self.backend.select_experiment(&id).await.map_err(|e| {
            error!("Failed to confirm selection of {}: {}", id, e);
            e
        })?;
        info!("Experiment selection confirmed: {}", id);
        Ok(())
    }

    pub async fn selected_experiment(&self) -> Option<ExperimentId> {
        self.store.read().await.selected().cloned()
    }

    /// Delete an experiment, then reload the list and clear the selection.
    pub async fn delete_experiment(&self, id: &ExperimentId) -> AppResult<()> {
        self.backend.delete_experiment(id).await.map_err(|e| {
            error!("Error deleting experiment {}: {}", id, e);
            e
        })?;
        info!("Experiment deleted: {}", id);
        self.store.write().await.clear_selection();
        self.refresh_experiments().await?;
        Ok(())
    }

    /// Download an experiment archive to `Experiment_{id}.zip` in the
    /// configured export directory.
    pub async fn export_experiment(&self, id: &ExperimentId) -> AppResult<PathBuf> {
        let archive = self.backend.export_experiment(id).await.map_err(|e| {
            error!("Error exporting experiment {}: {}", id, e);
            e
        })?;
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let path = self.export_dir.join(format!("Experiment_{}.zip", id));
        tokio::fs::write(&path, &archive).await?;
        info!("Exported experiment {} to {}", id, path.display());
        Ok(path)
    }

    /// Export the selected experiment.
    pub async fn export_selected(&self) -> AppResult<PathBuf> {
        let id = self
            .selected_experiment()
            .await
            .ok_or(MonitorError::NoSelection)?;
        self.export_experiment(&id).await
    }

    // =========================================================================
    // Capture
    // =========================================================================

    pub fn set_capture_interval(&mut self, secs: u64) -> AppResult<()> {
        self.scheduler.set_interval(secs)
    }

    /// Flip capture on or off; see [`CaptureScheduler::toggle_capture`].
    pub fn toggle_capture(&mut self) -> bool {
        self.scheduler.toggle_capture()
    }

    pub fn capture_active(&self) -> bool {
        self.scheduler.is_active()
    }

    /// One capture, awaited, for callers that want the result directly.
    pub async fn capture_once(&self) -> AppResult<Correlation> {
        let selected = self.selected_experiment().await;
        self.correlator.capture_and_correlate(selected).await
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Record a view switch and let the dispatcher react to it.
    pub fn switch_view(&self, index: usize) -> bool {
        self.view.set_current_view(index);
        self.dispatcher.on_view_changed(index)
    }

    /// Stop capturing and end all loops started by this session.
    pub fn teardown(&mut self) {
        self.scheduler.stop();
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            info!("Monitor session torn down");
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
