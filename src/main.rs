//! Kubernetes component heartbeat (v1)
//!
//! Answers "is component X in namespace Y healthy right now?" for external
//! monitors, by reading the cluster's own view of a deployment.
//!
//! # Architecture Overview
//!
//! ```text
//!     Monitor request
//!     ──────────────▶ http server ──▶ credential gate ──▶ admission limiter
//!                                                              │
//!                                                              ▼
//!                                                     workload evaluator
//!                                                              │
//!                                                              ▼
//!     200 / 500   ◀─────────────── status mapping ◀──── control plane (kube)
//!
//!     Cross-cutting: config (file + env + hot reload), observability
//!     (tracing + prometheus), lifecycle (signals, graceful shutdown)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use k8s_heartbeat::config::loader::{self, CONFIG_PATH_ENV};
use k8s_heartbeat::config::watcher::ConfigWatcher;
use k8s_heartbeat::health::{EvaluationPolicy, KubeControlPlane, WorkloadEvaluator};
use k8s_heartbeat::lifecycle::{termination_signal, Shutdown};
use k8s_heartbeat::observability::{init_logging, metrics};
use k8s_heartbeat::HttpServer;

#[derive(Parser)]
#[command(name = "k8s-heartbeat")]
#[command(about = "Health-check endpoint for Kubernetes deployments", long_about = None)]
struct Args {
    /// Optional TOML config file, watched for changes.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = loader::load(args.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.observability);

    tracing::info!("k8s-heartbeat v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.enabled,
        limit = config.rate_limit.limit,
        period_secs = config.rate_limit.period_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let control_plane = KubeControlPlane::connect(&config.control_plane)
        .await
        .context("failed to create Kubernetes client")?;
    let checker = Arc::new(WorkloadEvaluator::new(
        control_plane,
        EvaluationPolicy::from(&config.health),
    ));

    // Keep the watcher alive for the life of the process.
    let (_watcher, config_updates) = match args.config.as_deref() {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run().context("failed to watch config file")?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listener.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        termination_signal().await;
        tracing::info!("Termination signal received, draining");
        shutdown.trigger();
    });

    let server = HttpServer::new(config, checker);
    server.run(listener, config_updates, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
