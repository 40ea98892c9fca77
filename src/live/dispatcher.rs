//! View-change dispatch.

use super::poller::LivePoller;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Starts the live poller when the live view becomes visible.
///
/// Leaving the live view issues no stop: the poller notices on its next
/// cycle and ends itself.
pub struct ViewChangeDispatcher {
    poller: LivePoller,
    live_view_index: usize,
    cancel: CancellationToken,
}

impl ViewChangeDispatcher {
    /// Poll loops started by this dispatcher end when `cancel` is cancelled.
    pub fn new(poller: LivePoller, live_view_index: usize, cancel: CancellationToken) -> Self {
        Self {
            poller,
            live_view_index,
            cancel,
        }
    }

    pub fn live_view_index(&self) -> usize {
        self.live_view_index
    }

    /// Handle a view switch. Returns true if a new poll loop was started.
    pub fn on_view_changed(&self, new_index: usize) -> bool {
        if new_index != self.live_view_index {
            debug!("View changed to {}", new_index);
            return false;
        }
        if self.cancel.is_cancelled() {
            debug!("Session torn down, not starting live polling");
            return false;
        }
        info!("View changed to live telemetry ({})", new_index);
        self.poller.start(self.cancel.child_token()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::charts::{RecordingChartSink, TelemetryCharts};
    use crate::view::SharedViewState;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_only_live_view_starts_polling() {
        let backend = Arc::new(MockBackend::new());
        let view = Arc::new(SharedViewState::new(1));
        view.mount("t");
        view.mount("h");
        let poller = LivePoller::new(
            backend.clone(),
            view.clone(),
            Arc::new(RecordingChartSink::new()),
            TelemetryCharts::new("t", "h"),
            Duration::from_secs(1),
        );
        let cancel = CancellationToken::new();
        let dispatcher = ViewChangeDispatcher::new(poller.clone(), 1, cancel.clone());

        assert!(!dispatcher.on_view_changed(0));
        assert!(!poller.is_running());

        view.set_current_view(1);
        assert!(dispatcher.on_view_changed(1));
        assert!(!dispatcher.on_view_changed(1));
        assert!(poller.is_running());

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!poller.is_running());
        assert!(!dispatcher.on_view_changed(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!poller.is_running());
    }
}
