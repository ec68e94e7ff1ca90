//! # Timetracker Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use timetracker::{
    config::ConfigLoader,
    db,
    notify::{self, LogTransport},
    server::{AppState, run_server},
    telemetry::init_tracing,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "timetracker", version, about = "Timesheet and time-off approval API")]
struct Cli {
    /// Apply pending schema migrations before serving
    #[arg(long)]
    migrate: bool,
    /// Exit after migrating instead of starting the server
    #[arg(long, requires = "migrate")]
    migrate_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Layered env files, then the process environment
    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    init_tracing(&config).context("Failed to initialise tracing")?;

    if let Ok(redacted) = config.redacted_json() {
        tracing::info!(profile = %config.profile, config = %redacted, "Loaded configuration");
    }

    let db = db::init_pool(&config).await?;
    if cli.migrate {
        db::run_migrations(&db).await?;
        if cli.migrate_only {
            return Ok(());
        }
    }

    let shutdown = CancellationToken::new();
    let transport = Arc::new(LogTransport::from_config(&config.mail));
    let (notifier, dispatcher) = notify::channel(&config.mail, transport);
    let dispatcher = dispatcher.map(|d| d.spawn(shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal.cancel();
    });

    let state = AppState::new(config, db, notifier);
    let served = run_server(state, shutdown.clone()).await;

    shutdown.cancel();
    if let Some(handle) = dispatcher {
        let _ = handle.await;
    }
    served
}
