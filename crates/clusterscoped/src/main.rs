//! clusterscoped — the clusterscope daemon.
//!
//! Assembles the metrics pipeline in one process:
//! - Metrics store (shared cache)
//! - Watcher (resource events → store)
//! - Emitter (store → sink, every interval)
//!
//! # Usage
//!
//! ```text
//! clusterscoped run --events events.jsonl --interval 10s --format prometheus
//! clusterscoped check-config --config clusterscope.toml
//! ```

mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use clusterscope_core::ClusterscopeConfig;
use clusterscope_emitter::{Emitter, WriterSink};
use clusterscope_store::MetricsStore;
use clusterscope_watcher::Watcher;

use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(
    name = "clusterscoped",
    about = "clusterscope daemon — caches per-resource metrics and emits them every interval",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay resource events into the cache and emit metrics every interval.
    Run {
        /// Path to clusterscope.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON-lines event file ("-" for stdin).
        #[arg(long)]
        events: Option<PathBuf>,

        /// Emission interval, e.g. "10s", "500ms", "1m".
        #[arg(long)]
        interval: Option<String>,

        /// Output format: prometheus or json.
        #[arg(long)]
        format: Option<String>,

        /// Output file ("-" for stdout).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Log output format.
        #[arg(long, value_enum, default_value_t = LogFormat::Text)]
        log_format: LogFormat,
    },
    /// Parse a config file and print the effective settings.
    CheckConfig {
        /// Path to clusterscope.toml.
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            events,
            interval,
            format,
            output,
            log_format,
        } => {
            let overrides = Overrides {
                events,
                interval,
                format,
                output,
            };
            let settings = Settings::resolve(load_config(config.as_ref())?, overrides)?;
            init_tracing(&settings.log_filter, log_format);
            run(settings).await
        }
        Command::CheckConfig { config } => {
            let settings = Settings::resolve(load_config(Some(&config))?, Overrides::default())?;
            println!("{settings}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ClusterscopeConfig> {
    match path {
        Some(path) => ClusterscopeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ClusterscopeConfig::default()),
    }
}

/// Logs go to stderr; stdout may be carrying metrics.
fn init_tracing(config_filter: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter))
        .unwrap_or_else(|_| EnvFilter::new(settings::DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    info!(
        interval_ms = settings.interval.as_millis() as u64,
        format = %settings.format,
        "clusterscope daemon starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let store = Arc::new(MetricsStore::new());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &settings.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening event source {}", path.display()))?;
            info!(path = %path.display(), "reading events from file");
            Box::new(BufReader::new(file))
        }
        None => {
            info!("reading events from stdin");
            Box::new(BufReader::new(tokio::io::stdin()))
        }
    };

    let writer: Box<dyn AsyncWrite + Unpin + Send> = match &settings.output {
        Some(path) => {
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("creating metrics output {}", path.display()))?;
            info!(path = %path.display(), "writing metrics to file");
            Box::new(file)
        }
        None => Box::new(tokio::io::stdout()),
    };

    let mut watcher = Watcher::new(store.clone());
    let mut emitter = Emitter::new(
        store,
        WriterSink::new(writer, settings.format),
        settings.interval,
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher_shutdown = shutdown_rx.clone();

    // ── Start background tasks ─────────────────────────────────

    let watcher_handle = tokio::spawn(async move { watcher.run(reader, watcher_shutdown).await });
    let emitter_handle = tokio::spawn(async move { emitter.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");
    signal_shutdown(&shutdown_tx);

    match watcher_handle.await? {
        Ok(stats) => info!(applied = stats.applied, skipped = stats.skipped, "events processed"),
        Err(e) => error!(error = %e, "watcher failed"),
    }
    emitter_handle.await?;

    info!("clusterscope daemon stopped");
    Ok(())
}

/// Returns false when every task had already stopped.
fn signal_shutdown(tx: &watch::Sender<bool>) -> bool {
    match tx.send(true) {
        Ok(()) => true,
        Err(_) => {
            debug!("shutdown signal had no listeners, tasks already stopped");
            false
        }
    }
}
