//! Capture scheduling.
//!
//! `CaptureScheduler` holds the capture session state:
//!
//! - `active`: whether captures are switched on
//! - `interval_secs`: cadence; 0 means instant mode (one capture per toggle)
//! - `timer`: handle of the repeating capture task
//!
//! `timer` is `Some` only while `active` is true and the interval is
//! non-zero. Changing the interval while active does not touch the running
//! timer; it takes effect on the next stop/start cycle. Dropping the
//! scheduler stops it.

use super::correlator::CaptureCorrelator;
use crate::error::{AppResult, MonitorError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Human label for an interval, as shown on the cadence slider.
pub fn interval_label(secs: u64) -> String {
    match secs {
        0 => "Instant".to_string(),
        s if s >= 1000 => format!("{}k", (s as f64 / 1000.0).round() as u64),
        s => s.to_string(),
    }
}

/// Drives one-shot or repeating captures.
pub struct CaptureScheduler {
    correlator: Arc<CaptureCorrelator>,
    active: bool,
    interval_secs: u64,
    max_interval_secs: u64,
    timer: Option<JoinHandle<()>>,
}

impl CaptureScheduler {
    pub fn new(
        correlator: Arc<CaptureCorrelator>,
        interval_secs: u64,
        max_interval_secs: u64,
    ) -> Self {
        Self {
            correlator,
            active: false,
            interval_secs: interval_secs.min(max_interval_secs),
            max_interval_secs,
            timer: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True while a repeating capture timer is running.
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Set the cadence used by the next activation.
    pub fn set_interval(&mut self, secs: u64) -> AppResult<()> {
        if secs > self.max_interval_secs {
            return Err(MonitorError::InvalidInterval {
                requested: secs,
                max: self.max_interval_secs,
            });
        }
        if self.active && secs != self.interval_secs {
            debug!(
                "Interval changed to {}s while capturing; applies after restart",
                secs
            );
        }
        self.interval_secs = secs;
        Ok(())
    }

    /// Flip capture on or off. Returns the new `active` state.
    ///
    /// In instant mode this fires a single capture and leaves the scheduler
    /// inactive, so the returned state is always `false`.
    pub fn toggle_capture(&mut self) -> bool {
        self.active = !self.active;
        if self.active {
            self.start();
        } else {
            self.stop();
        }
        self.active
    }

    fn start(&mut self) {
        if self.interval_secs == 0 {
            info!("Instant capture");
            Self::fire(Arc::clone(&self.correlator));
            self.active = false;
            return;
        }

        let period = Duration::from_secs(self.interval_secs);
        info!("Capturing every {}s", self.interval_secs);
        let correlator = Arc::clone(&self.correlator);
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                Self::fire(Arc::clone(&correlator));
            }
        }));
    }

    /// Stop capturing. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!("Capture timer stopped");
        }
        self.active = false;
    }

    /// Run one capture as its own task so a slow backend never delays the
    /// next tick. Failures are logged by the correlator.
    fn fire(correlator: Arc<CaptureCorrelator>) {
        tokio::spawn(async move {
            let selected = correlator.store().read().await.selected().cloned();
            let _ = correlator.capture_and_correlate(selected).await;
        });
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_labels() {
        assert_eq!(interval_label(0), "Instant");
        assert_eq!(interval_label(5), "5");
        assert_eq!(interval_label(999), "999");
        assert_eq!(interval_label(1000), "1k");
        assert_eq!(interval_label(2600), "3k");
    }
}
