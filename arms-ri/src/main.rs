//! arms-ri (Result Ingest) - transcript upload service
//!
//! Accepts result documents, runs them through the external parser and
//! merges the extracted semesters into the record store, one atomic batch
//! per upload.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arms_common::config::{load_default_toml_config, load_toml_config, resolve_root_folder, RootFolderInitializer};
use arms_ri::ingest::{IngestService, ProcessGateway};
use arms_ri::{build_router, AppState, DEFAULT_PORT};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for arms-ri
#[derive(Parser, Debug)]
#[command(name = "arms-ri")]
#[command(about = "Result Ingest service for ARMS")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ARMS_RI_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and batch workspaces
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Configuration file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_toml_config(path)?,
        None => load_default_toml_config()?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting ARMS Result Ingest (arms-ri) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let pool = arms_common::db::init_database(&db_path).await?;

    let gateway = ProcessGateway::from_config(&config.extraction);
    info!(
        program = %config.extraction.program,
        timeout_secs = config.extraction.timeout_secs,
        reject_duplicate_semesters = config.merge.reject_duplicate_semesters,
        credit_update = ?config.merge.reappear_credit_update,
        "Ingestion configured"
    );

    let ingest = IngestService::new(
        pool.clone(),
        Arc::new(gateway),
        initializer.temp_path(),
        config.merge.clone(),
    );
    let state = AppState::new(pool, ingest, config.max_upload_bytes);
    let app = build_router(state);

    let port = args.port.or(config.ri_port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("arms-ri listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("arms-ri stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
