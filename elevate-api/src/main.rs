//! elevate-api - admin HTTP service entry point
//!
//! Resolves configuration (CLI, environment, config file, compiled defaults),
//! opens the media database and serves the admin routes until Ctrl+C or
//! SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use elevate_common::config::{ReconcileArgs, ReconcileOverrides, TomlConfig};
use elevate_common::db::init_database;
use elevate_api::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for elevate-api
#[derive(Parser, Debug)]
#[command(name = "elevate-api")]
#[command(about = "Admin service for media reference reconciliation")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "ELEVATE_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "ELEVATE_BIND")]
    bind: Option<String>,

    /// SQLite database holding the music records
    #[arg(short, long, env = "ELEVATE_DATABASE")]
    database: Option<PathBuf>,

    /// Config file (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    reconcile: ReconcileArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elevate_api=debug,elevate_common=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting elevate-api v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load(args.config.as_deref())?;

    // Invalid reconciliation settings are fatal at startup, not per request
    let settings = ReconcileOverrides::from(args.reconcile)
        .resolve(&toml_config.reconcile)
        .context("Invalid reconciliation configuration")?;
    info!(
        stale_host = settings.matcher().marker(),
        target = %settings.target_form(),
        timeout_ms = settings.store_timeout().as_millis() as u64,
        "Reconciliation settings resolved"
    );

    let db_path = toml_config.resolve_database_path(args.database);
    info!("Database path: {}", db_path.display());
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let app = build_router(AppState::new(pool, settings));

    let addr = format!(
        "{}:{}",
        toml_config.resolve_bind_address(args.bind),
        toml_config.resolve_port(args.port)
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("elevate-api listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
