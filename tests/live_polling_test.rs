//! Live telemetry tests
//!
//! Chart readiness, the view-change driven poll loop and its self-termination
//! paths, run through a whole session on paused time.

mod common;

use common::{harness, settle};
use droplet_monitor::readiness::Readiness;
use std::time::Duration;
use tokio::time::sleep;

const LIVE: usize = 1;
const SETUP: usize = 0;

#[tokio::test(start_paused = true)]
async fn test_charts_initialize_once_mount_points_appear() {
    let h = harness();
    let temperature = h.settings.live.temperature_mount.clone();
    let humidity = h.settings.live.humidity_mount.clone();

    let mount_later = async {
        sleep(Duration::from_millis(250)).await;
        h.mount_charts();
    };
    let (readiness, ()) = tokio::join!(h.session.init_charts(), mount_later);

    assert!(readiness.is_ready());
    assert!(h.sink.is_initialized(&temperature));
    assert!(h.sink.is_initialized(&humidity));
}

#[tokio::test(start_paused = true)]
async fn test_charts_not_initialized_after_teardown() {
    let mut h = harness();
    h.session.teardown();

    let readiness = h.session.init_charts().await;
    assert_eq!(readiness, Readiness::Cancelled);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_entering_live_view_polls_every_period() {
    let h = harness();
    h.mount_charts();
    h.session.init_charts().await;

    assert!(h.session.switch_view(LIVE));
    // A second switch while polling must not start another loop.
    assert!(!h.session.switch_view(LIVE));

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(h.backend.live_calls(), 3);
    assert!(h.session.poller().is_running());

    let temperature = h.sink.points(&h.settings.live.temperature_mount);
    let humidity = h.sink.points(&h.settings.live.humidity_mount);
    assert_eq!(temperature.len(), 3);
    assert_eq!(humidity.len(), 3);
    assert!(temperature.windows(2).all(|w| w[0].x <= w[1].x));
}

#[tokio::test(start_paused = true)]
async fn test_other_views_do_not_poll() {
    let h = harness();
    h.mount_charts();

    assert!(!h.session.switch_view(SETUP));
    assert!(!h.session.switch_view(2));
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.backend.live_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_leaving_live_view_stops_after_one_more_fetch() {
    let h = harness();
    h.mount_charts();
    h.session.switch_view(LIVE);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(h.backend.live_calls(), 1);
    h.session.switch_view(SETUP);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.backend.live_calls(), 2);
    assert!(!h.session.poller().is_running());
    // The reading that arrived after leaving is not drawn.
    assert_eq!(h.sink.points(&h.settings.live.temperature_mount).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_halts_until_view_reentered() {
    let h = harness();
    h.mount_charts();
    h.backend.fail_next_live_reads(1);

    assert!(h.session.switch_view(LIVE));
    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.backend.live_calls(), 1);
    assert!(!h.session.poller().is_running());
    assert!(h.sink.points(&h.settings.live.temperature_mount).is_empty());

    h.session.switch_view(SETUP);
    assert!(h.session.switch_view(LIVE));
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.backend.live_calls(), 3);
    assert!(h.session.poller().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_missing_mount_point_ends_loop_without_fetch() {
    let h = harness();
    h.view.mount(h.settings.live.temperature_mount.clone());

    h.session.switch_view(LIVE);
    settle().await;
    assert_eq!(h.backend.live_calls(), 0);
    assert!(!h.session.poller().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_unmounting_chart_stops_polling() {
    let h = harness();
    h.mount_charts();
    h.session.switch_view(LIVE);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.backend.live_calls(), 2);
    h.view.unmount(&h.settings.live.humidity_mount);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.backend.live_calls(), 2);
    assert!(!h.session.poller().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_poll_loop() {
    let mut h = harness();
    h.mount_charts();
    h.session.switch_view(LIVE);

    sleep(Duration::from_millis(1500)).await;
    assert!(h.session.poller().is_running());

    h.session.teardown();
    settle().await;
    assert!(!h.session.poller().is_running());
    let calls = h.backend.live_calls();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.backend.live_calls(), calls);

    // A torn-down session never polls again.
    assert!(!h.session.switch_view(LIVE));
}
