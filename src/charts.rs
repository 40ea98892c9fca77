//! Live telemetry charts
//!
//! The charting library is reached through [`ChartSink`], which mirrors the
//! two calls the monitor makes: `initialize` a chart into a mount point, and
//! `extend` one of its series by a single point without redrawing.
//!
//! [`TelemetryCharts`] owns the chart definitions (temperature and relative
//! humidity over time). Two sinks ship with the crate:
//!
//! - [`LogChartSink`]: headless rendering as structured log lines
//! - [`RecordingChartSink`]: keeps a rolling history per mount point, used by
//!   tests and by front-ends that redraw from it

use crate::experiment::LiveTelemetryPoint;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Maximum points kept per series by [`RecordingChartSink`]
const MAX_HISTORY: usize = 500;

/// One plotted series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub name: String,
    /// Trace mode, e.g. `lines+markers`
    pub mode: String,
    /// Trace type, e.g. `scatter`
    pub kind: String,
}

/// Titles of a chart and its axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
}

/// Rendering options passed through to the charting library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartConfig {
    pub responsive: bool,
}

/// A single (time, value) sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

/// Charting library boundary.
pub trait ChartSink: Send + Sync {
    /// Create (or recreate) a chart with empty series in `mount_point`.
    fn initialize(
        &self,
        mount_point: &str,
        series: &[SeriesSpec],
        layout: &ChartLayout,
        config: &ChartConfig,
    );

    /// Append one point to series `series_index` of the chart in
    /// `mount_point`.
    fn extend(&self, mount_point: &str, point: ChartPoint, series_index: usize);
}

/// The temperature and humidity charts of the live view.
#[derive(Debug, Clone)]
pub struct TelemetryCharts {
    temperature_mount: String,
    humidity_mount: String,
}

impl TelemetryCharts {
    pub fn new(temperature_mount: impl Into<String>, humidity_mount: impl Into<String>) -> Self {
        Self {
            temperature_mount: temperature_mount.into(),
            humidity_mount: humidity_mount.into(),
        }
    }

    pub fn temperature_mount(&self) -> &str {
        &self.temperature_mount
    }

    pub fn humidity_mount(&self) -> &str {
        &self.humidity_mount
    }

    /// Mount points that must exist before the charts can be used.
    pub fn mount_points(&self) -> [&str; 2] {
        [self.temperature_mount.as_str(), self.humidity_mount.as_str()]
    }

    /// Create both charts with empty series.
    pub fn initialize(&self, sink: &dyn ChartSink) {
        let config = ChartConfig { responsive: true };

        sink.initialize(
            &self.temperature_mount,
            &[series("Temperature")],
            &ChartLayout {
                title: "Temperature".to_string(),
                x_axis_title: "Time".to_string(),
                y_axis_title: "Temperature (°C)".to_string(),
            },
            &config,
        );
        sink.initialize(
            &self.humidity_mount,
            &[series("Humidity")],
            &ChartLayout {
                title: "Relative Humidity".to_string(),
                x_axis_title: "Time".to_string(),
                y_axis_title: "Humidity (%)".to_string(),
            },
            &config,
        );
    }

    /// Extend both charts with one live point.
    pub fn append(&self, sink: &dyn ChartSink, point: &LiveTelemetryPoint) {
        sink.extend(
            &self.temperature_mount,
            ChartPoint {
                x: point.timestamp,
                y: point.temperature,
            },
            0,
        );
        sink.extend(
            &self.humidity_mount,
            ChartPoint {
                x: point.timestamp,
                y: point.humidity,
            },
            0,
        );
    }
}

fn series(name: &str) -> SeriesSpec {
    SeriesSpec {
        name: name.to_string(),
        mode: "lines+markers".to_string(),
        kind: "scatter".to_string(),
    }
}

/// Renders charts as log lines; for headless runs.
#[derive(Debug, Default)]
pub struct LogChartSink;

impl ChartSink for LogChartSink {
    fn initialize(
        &self,
        mount_point: &str,
        series: &[SeriesSpec],
        layout: &ChartLayout,
        _config: &ChartConfig,
    ) {
        info!(
            mount_point,
            title = %layout.title,
            y_axis = %layout.y_axis_title,
            series = series.len(),
            "Chart initialized"
        );
    }

    fn extend(&self, mount_point: &str, point: ChartPoint, series_index: usize) {
        info!(
            mount_point,
            series = series_index,
            time = %point.x.to_rfc3339(),
            value = point.y,
            "Chart extended"
        );
    }
}

/// A call received by [`RecordingChartSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChartCall {
    Initialize { mount_point: String, layout: ChartLayout },
    Extend { mount_point: String, point: ChartPoint, series_index: usize },
}

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<ChartCall>,
    history: HashMap<String, VecDeque<ChartPoint>>,
}

/// Keeps every call and a rolling per-chart history of series 0.
#[derive(Debug, Default)]
pub struct RecordingChartSink {
    recorded: Mutex<Recorded>,
}

impl RecordingChartSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ChartCall> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
            .clone()
    }

    /// True once `initialize` has been called for `mount_point`.
    pub fn is_initialized(&self, mount_point: &str) -> bool {
        self.calls().iter().any(|call| {
            matches!(call, ChartCall::Initialize { mount_point: m, .. } if m == mount_point)
        })
    }

    /// Points currently displayed in `mount_point`, oldest first.
    pub fn points(&self, mount_point: &str) -> Vec<ChartPoint> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .get(mount_point)
            .map(|points| points.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl ChartSink for RecordingChartSink {
    fn initialize(
        &self,
        mount_point: &str,
        _series: &[SeriesSpec],
        layout: &ChartLayout,
        _config: &ChartConfig,
    ) {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.calls.push(ChartCall::Initialize {
            mount_point: mount_point.to_string(),
            layout: layout.clone(),
        });
        recorded
            .history
            .insert(mount_point.to_string(), VecDeque::with_capacity(MAX_HISTORY));
    }

    fn extend(&self, mount_point: &str, point: ChartPoint, series_index: usize) {
        let mut recorded = self.recorded.lock().unwrap_or_else(PoisonError::into_inner);
        recorded.calls.push(ChartCall::Extend {
            mount_point: mount_point.to_string(),
            point,
            series_index,
        });
        let history = recorded.history.entry(mount_point.to_string()).or_default();
        if history.len() >= MAX_HISTORY {
            history.pop_front();
        }
        history.push_back(point);
    }
}
