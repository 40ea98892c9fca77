//! Droplet monitor command-line front-end.
//!
//! Headless counterpart of the operator UI: manage experiments, run
//! captures (instant or on a cadence) and follow the live telemetry stream,
//! with charts rendered as log lines.
//!
//! ```bash
//! droplet-monitor --backend http://droplet.local:5000 experiments list
//! droplet-monitor capture --experiment 3 --interval 30 --duration 600
//! droplet-monitor live --duration 60
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use droplet_monitor::{
    backend::{http::parse_base_url, HttpBackend},
    capture::{interval_label, Correlation},
    charts::LogChartSink,
    config::{settings::DEFAULT_CONFIG_PATH, Settings},
    experiment::ExperimentId,
    view::SharedViewState,
    MonitorSession,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "droplet-monitor", version, about = "Droplet experiment monitor")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the backend base URL
    #[arg(long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage experiments
    Experiments {
        #[command(subcommand)]
        action: ExperimentAction,
    },
    /// Capture sensor data into the selected experiment
    Capture {
        /// Experiment to select before capturing
        #[arg(long)]
        experiment: Option<String>,
        /// Seconds between captures; 0 captures once
        #[arg(long)]
        interval: Option<u64>,
        /// How long to keep capturing, in seconds (default: until Ctrl-C)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Follow the live temperature and humidity stream
    Live {
        /// How long to follow, in seconds (default: until Ctrl-C)
        #[arg(long)]
        duration: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum ExperimentAction {
    /// List experiments and their entry counts
    List,
    /// Create and select a new experiment
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Select the experiment new captures go to
    Select { id: String },
    /// Delete an experiment
    Delete { id: String },
    /// Download an experiment archive
    Export {
        id: String,
        /// Directory to write the archive to
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;
    if let Some(url) = cli.backend.clone() {
        settings.backend.base_url = url;
    }
    if let Command::Experiments {
        action: ExperimentAction::Export {
            output: Some(dir), ..
        },
    } = &cli.command
    {
        settings.export.output_dir = dir.clone();
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    format!("droplet_monitor={}", settings.application.log_level).parse()?,
                )
                .add_directive("reqwest=warn".parse()?)
                .add_directive("hyper=warn".parse()?),
        )
        .init();

    info!("Starting {}", settings.application.name);

    let base = parse_base_url(&settings.backend.base_url)
        .with_context(|| format!("Invalid backend URL {}", settings.backend.base_url))?;
    let backend = Arc::new(
        HttpBackend::new(base.as_str(), settings.backend.request_timeout())
            .context("Failed to create backend client")?,
    );
    let view = Arc::new(SharedViewState::new(settings.live.live_view_index));
    let mut session = MonitorSession::new(&settings, backend, view, Arc::new(LogChartSink));

    let result = match cli.command {
        Command::Experiments { action } => run_experiments(&session, action).await,
        Command::Capture {
            experiment,
            interval,
            duration,
        } => run_capture(&mut session, &base, experiment, interval, duration).await,
        Command::Live { duration } => run_live(&session, &settings, duration).await,
    };

    session.teardown();
    result
}

async fn run_experiments(session: &MonitorSession, action: ExperimentAction) -> Result<()> {
    match action {
        ExperimentAction::List => {
            session.refresh_experiments().await?;
            let store = session.store().read().await;
            for experiment in store.experiments() {
                let entries = experiment.data_entries.as_ref().map_or(0, Vec::len);
                println!(
                    "{:>6}  {:<32} {:>5} entries  {}",
                    experiment.id, experiment.name, entries, experiment.description
                );
            }
        }
        ExperimentAction::Create { name, description } => {
            let experiment = session.create_experiment(&name, description).await?;
            println!("Created experiment {} ({})", experiment.id, experiment.name);
        }
        ExperimentAction::Select { id } => {
            session.select_experiment(ExperimentId::new(id)).await?;
        }
        ExperimentAction::Delete { id } => {
            session.delete_experiment(&ExperimentId::new(id)).await?;
        }
        ExperimentAction::Export { id, .. } => {
            let path = session.export_experiment(&ExperimentId::new(id)).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn run_capture(
    session: &mut MonitorSession,
    base: &Url,
    experiment: Option<String>,
    interval: Option<u64>,
    duration: Option<u64>,
) -> Result<()> {
    session.refresh_experiments().await?;
    if let Some(id) = experiment {
        session.select_experiment(ExperimentId::new(id)).await?;
    }
    if session.selected_experiment().await.is_none() {
        warn!("No experiment selected; captures go wherever the backend decides");
    }
    if let Some(secs) = interval {
        session.set_capture_interval(secs)?;
    }

    let secs = session.scheduler().interval_secs();
    if secs == 0 {
        match session.capture_once().await? {
            Correlation::Merged(entry) => {
                println!(
                    "Captured entry {} at {}: {} °C, {} %",
                    entry.id,
                    entry.timestamp,
                    reading(entry.temperature),
                    reading(entry.humidity)
                );
                if let Some(image) = entry.image_url(base) {
                    println!("Image: {}", image);
                }
            }
            Correlation::Discarded(id) => println!("Captured entry {}", id),
        }
        return Ok(());
    }

    info!("Capture interval: {}", interval_label(secs));
    session.toggle_capture();
    wait(duration).await;
    session.teardown();

    let store = session.store().read().await;
    if let Some(entry) = store.last_captured() {
        println!("Last captured entry {} at {}", entry.id, entry.timestamp);
        if let Some(image) = entry.image_url(base) {
            println!("Image: {}", image);
        }
    }
    Ok(())
}

async fn run_live(
    session: &MonitorSession,
    settings: &Settings,
    duration: Option<u64>,
) -> Result<()> {
    // A headless run has nothing to mount into; provide the mount points
    // ourselves so the readiness gate passes.
    session.view().mount(settings.live.temperature_mount.clone());
    session.view().mount(settings.live.humidity_mount.clone());

    if !session.init_charts().await.is_ready() {
        return Ok(());
    }
    session.switch_view(settings.live.live_view_index);
    wait(duration).await;
    session.switch_view(0);
    Ok(())
}

/// Sleep for `duration` seconds, or until Ctrl-C when no duration is given.
async fn wait(duration: Option<u64>) {
    let until_stopped = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = until_stopped => info!("Interrupted"),
            }
        }
        None => until_stopped.await,
    }
}

fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"))
}
