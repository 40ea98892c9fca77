//! Core library for the droplet experiment monitor.
//!
//! This library coordinates a droplet sensor station from the client side:
//! it schedules sensor captures against the experiment backend, correlates
//! each capture with the full data record, and drives a self-pacing live
//! telemetry loop that only runs while the live view is visible. It is used
//! by the `droplet-monitor` command-line front-end.
//!
//! The backend, the charting library and the view layer are collaborators
//! reached through the [`backend::Backend`], [`charts::ChartSink`] and
//! [`view::ViewState`] traits.

pub mod backend;
pub mod capture;
pub mod charts;
pub mod config;
pub mod error;
pub mod experiment;
pub mod live;
pub mod readiness;
pub mod session;
pub mod view;

pub use error::{AppResult, MonitorError};
pub use session::MonitorSession;
