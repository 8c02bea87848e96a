//! arms-rr (Records Review) - read-only result lookups
//!
//! Serves student, name-search and programme/batch views over the record
//! store written by arms-ri.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use arms_common::config::{load_default_toml_config, load_toml_config, resolve_root_folder, RootFolderInitializer};
use arms_rr::{build_router, AppState, DEFAULT_PORT};
use clap::Parser;
use tracing::{error, info};

/// Command-line arguments for arms-rr
#[derive(Parser, Debug)]
#[command(name = "arms-rr")]
#[command(about = "Records Review service for ARMS")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ARMS_RR_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
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

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();

    // Build identification first, before any database delay
    info!(
        "Starting ARMS Records Review (arms-rr) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    let initializer = RootFolderInitializer::new(root_folder);
    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match arms_rr::db::connect_readonly(&db_path).await {
        Ok(pool) => {
            info!("Connected to database (read-only)");
            pool
        }
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e);
        }
    };

    let app = build_router(AppState::new(pool));

    let port = args.port.or(config.rr_port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("arms-rr listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
