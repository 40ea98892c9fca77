//! Live telemetry poll loop.

use crate::backend::Backend;
use crate::charts::{ChartSink, TelemetryCharts};
use crate::experiment::LiveTelemetryPoint;
use crate::view::ViewState;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default delay between live polls
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Why a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The session was torn down.
    Cancelled,
    /// A chart mount point no longer exists.
    MountPointMissing,
    /// The live view was not showing when a reading arrived.
    ViewLeft,
    /// Fetching the live reading failed.
    FetchFailed,
}

struct PollerInner {
    backend: Arc<dyn Backend>,
    view: Arc<dyn ViewState>,
    sink: Arc<dyn ChartSink>,
    charts: TelemetryCharts,
    period: Duration,
    running: AtomicBool,
}

/// Clears the running flag however the loop task ends.
struct RunningGuard(Arc<PollerInner>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// At most one poll loop runs per poller; cloning shares the loop state.
#[derive(Clone)]
pub struct LivePoller {
    inner: Arc<PollerInner>,
}

impl LivePoller {
    pub fn new(
        backend: Arc<dyn Backend>,
        view: Arc<dyn ViewState>,
        sink: Arc<dyn ChartSink>,
        charts: TelemetryCharts,
        period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                backend,
                view,
                sink,
                charts,
                period,
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start polling unless a loop is already running.
    ///
    /// Returns the loop's handle, or `None` when this call was a no-op.
    pub fn start(&self, cancel: CancellationToken) -> Option<JoinHandle<PollExit>> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Live poller already running");
            return None;
        }

        info!("Live telemetry polling started");
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let _running = RunningGuard(Arc::clone(&inner));
            let exit = inner.run(&cancel).await;
            info!(?exit, "Live telemetry polling stopped");
            exit
        }))
    }
}

impl PollerInner {
    async fn run(&self, cancel: &CancellationToken) -> PollExit {
        loop {
            if cancel.is_cancelled() {
                return PollExit::Cancelled;
            }

            let mounted = self
                .charts
                .mount_points()
                .iter()
                .all(|m| self.view.mount_point_exists(m));
            if !mounted {
                debug!("Chart mount points not found, skipping update");
                return PollExit::MountPointMissing;
            }

            let reading = tokio::select! {
                _ = cancel.cancelled() => return PollExit::Cancelled,
                result = self.backend.fetch_live_reading() => match result {
                    Ok(reading) => reading,
                    Err(e) => {
                        error!("Live reading failed, live updates halted: {}", e);
                        return PollExit::FetchFailed;
                    }
                },
            };
            let point = LiveTelemetryPoint::received(reading, Utc::now());

            // The view may have changed while the request was in flight.
            if !self.view.is_live_view_active() {
                debug!("Live view no longer visible, discarding reading");
                return PollExit::ViewLeft;
            }

            debug!(
                temperature = point.temperature,
                humidity = point.humidity,
                "Updating charts"
            );
            self.charts.append(self.sink.as_ref(), &point);

            tokio::select! {
                _ = cancel.cancelled() => return PollExit::Cancelled,
                _ = tokio::time::sleep(self.period) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::charts::RecordingChartSink;
    use crate::view::SharedViewState;

    struct Fixture {
        backend: Arc<MockBackend>,
        view: Arc<SharedViewState>,
        sink: Arc<RecordingChartSink>,
        poller: LivePoller,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(MockBackend::new());
        let view = Arc::new(SharedViewState::new(1));
        view.mount("t");
        view.mount("h");
        view.set_current_view(1);
        let sink = Arc::new(RecordingChartSink::new());
        let poller = LivePoller::new(
            backend.clone(),
            view.clone(),
            sink.clone(),
            TelemetryCharts::new("t", "h"),
            DEFAULT_POLL_PERIOD,
        );
        Fixture {
            backend,
            view,
            sink,
            poller,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let f = fixture();
        let cancel = CancellationToken::new();

        let handle = f.poller.start(cancel.clone());
        assert!(handle.is_some());
        assert!(f.poller.is_running());
        assert!(f.poller.start(cancel.clone()).is_none());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(f.backend.live_calls(), 3);
        assert_eq!(f.sink.points("t").len(), 3);
        assert_eq!(f.sink.points("h").len(), 3);

        cancel.cancel();
        assert_eq!(handle.unwrap().await.unwrap(), PollExit::Cancelled);
        assert!(!f.poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_mount_point_stops_without_fetch() {
        let f = fixture();
        f.view.unmount("h");

        let exit = f
            .poller
            .start(CancellationToken::new())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(exit, PollExit::MountPointMissing);
        assert_eq!(f.backend.live_calls(), 0);
        assert!(!f.poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_arriving_after_view_change_is_discarded() {
        let f = fixture();
        f.backend.set_live_delay(Duration::from_millis(300));
        let handle = f.poller.start(CancellationToken::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        f.view.set_current_view(0);

        assert_eq!(handle.await.unwrap(), PollExit::ViewLeft);
        assert_eq!(f.backend.live_calls(), 1);
        assert!(f.sink.points("t").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_fetch() {
        let f = fixture();
        f.backend.set_live_delay(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let handle = f.poller.start(cancel.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), PollExit::Cancelled);
        assert!(f.sink.points("t").is_empty());
    }
}
