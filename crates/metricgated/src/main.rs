//! metricgated — the metricgate daemon.
//!
//! Single binary that assembles the gateway:
//! - State store (redb)
//! - Catalogue actor
//! - Remote-write exporter (when a URL is configured)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! metricgated serve --listen 0.0.0.0:9091 --data-dir /var/lib/metricgate
//! ```

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use metricgate_aggregator::CatalogueHandle;
use metricgate_api::{ApiState, build_router};
use metricgate_core::GatewayConfig;
use metricgate_export::Exporter;
use metricgate_state::StateStore;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,metricgated=debug,metricgate=debug")
                }),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => {
            let config = args.load_config()?;
            run_serve(config).await
        }
    }
}

async fn run_serve(config: GatewayConfig) -> anyhow::Result<()> {
    info!("metricgate daemon starting");

    // Ensure data directory exists.
    let data_dir = &config.storage.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db_path = data_dir.join("metricgate.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let state = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let (catalogue, catalogue_task) = CatalogueHandle::spawn(state);

    let exporter = Exporter::from_config(&config.export, catalogue.clone())?.map(Arc::new);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let export_task = match &exporter {
        Some(exporter) => {
            let exporter = exporter.clone();
            let interval = Duration::from_secs(config.export.interval_secs);
            Some(tokio::spawn(async move {
                exporter.run(interval, shutdown_rx).await;
            }))
        }
        None => {
            info!("no remote-write URL configured, export loop not started");
            None
        }
    };

    // ── Start API server ───────────────────────────────────────

    let router = build_router(ApiState {
        catalogue: catalogue.clone(),
        exporter,
    });
    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", config.server.listen))?;

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Final export, then stop the catalogue.
    if let Some(task) = export_task {
        let _ = task.await;
    }
    catalogue.shutdown().await;
    let _ = catalogue_task.await;

    info!("metricgate daemon stopped");
    Ok(())
}
