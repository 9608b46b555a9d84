//! rununtil - run heartbeat workers until a termination signal arrives
//!
//! Usage:
//!     rununtil [--config <path>]
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use rununtil::config::{load_config, Config};
use rununtil::util::init_logging;
use rununtil::{shutdown_fn, BoxWorker, CancelRegistry, Runner, WorkerFn};

/// Run heartbeat workers until SIGINT/SIGTERM, then shut them down gracefully.
#[derive(Parser, Debug)]
#[command(name = "rununtil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (defaults are used if omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).with_context(|| {
            format!("failed to load configuration from '{}'", path.display())
        })?,
        None => Config::default(),
    };

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format);

    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Signals: {:?}", config.run.signals);
        println!(
            "  Heartbeat workers: {} every {}",
            config.heartbeat.workers,
            humantime::format_duration(config.heartbeat.interval)
        );
        return Ok(());
    }

    info!(
        signals = ?config.run.signals,
        workers = config.heartbeat.workers,
        "rununtil starting"
    );

    run(config)
}

/// Run the workers with the given configuration.
fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(config).await })
}

/// Async entry point.
async fn run_async(config: Config) -> Result<()> {
    let registry = CancelRegistry::new();
    let runner = Runner::from_config(registry, &config.run);

    let workers: Vec<BoxWorker> = (0..config.heartbeat.workers)
        .map(|index| heartbeat_worker(index, config.heartbeat.interval))
        .collect();

    info!("rununtil is running");
    info!(signals = ?runner.signals(), "send a configured signal to stop");

    let outcome = runner.run(workers).await.context("run failed")?;

    info!(
        termination = %outcome.termination,
        faults = outcome.faults.len(),
        "rununtil shut down complete"
    );
    Ok(())
}

/// A worker that logs a heartbeat every `interval` until shut down.
fn heartbeat_worker(index: u32, interval: Duration) -> BoxWorker {
    WorkerFn::boxed(format!("heartbeat-{index}"), move || {
        let task = tokio::spawn(heartbeat(index, interval));
        shutdown_fn(move || {
            task.abort();
            info!(worker = index, "heartbeat stopped");
        })
    })
}

async fn heartbeat(index: u32, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    let mut beats: u64 = 0;
    loop {
        ticker.tick().await;
        beats += 1;
        debug!(worker = index, beats, "heartbeat");
    }
}
