//! Viewport readiness gate
//!
//! Charts can only be initialized once their mount points exist in the
//! current view. The gate checks for a mount point, runs the caller's
//! continuation as soon as it is present, and otherwise re-checks after a
//! short fixed delay for as long as it takes. A cancellation token is checked
//! before every re-check so a torn-down view never leaves a retry chain
//! behind.

use crate::view::ViewState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default delay between mount point checks
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Outcome of waiting for a mount point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The mount point was found on check number `attempts` (1-based).
    Ready { attempts: u32 },
    /// The token was cancelled before the mount point appeared.
    Cancelled,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }
}

/// Wait until `mount_point` exists, then run `on_ready` exactly once.
///
/// When the mount point is already present, `on_ready` runs before this
/// function first yields.
pub async fn ensure_ready<F>(
    view: &dyn ViewState,
    mount_point: &str,
    retry_delay: Duration,
    cancel: &CancellationToken,
    on_ready: F,
) -> Readiness
where
    F: FnOnce(),
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if view.mount_point_exists(mount_point) {
            debug!(mount_point, attempts, "Mount point ready");
            on_ready();
            return Readiness::Ready { attempts };
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(mount_point, attempts, "Stopped waiting for mount point");
                return Readiness::Cancelled;
            }
            _ = tokio::time::sleep(retry_delay) => {}
        }
    }
}

/// Wait for several mount points in order.
///
/// `attempts` in the result is the total number of checks made.
pub async fn ensure_all_ready(
    view: &dyn ViewState,
    mount_points: &[&str],
    retry_delay: Duration,
    cancel: &CancellationToken,
) -> Readiness {
    let mut total = 0;
    for mount_point in mount_points {
        match ensure_ready(view, mount_point, retry_delay, cancel, || {}).await {
            Readiness::Ready { attempts } => total += attempts,
            Readiness::Cancelled => return Readiness::Cancelled,
        }
    }
    Readiness::Ready { attempts: total }
}
