//! arms-ri library - Result Ingest service
//!
//! Exposes the ingestion engine and router for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod ingest;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ingest::IngestService;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ingestion engine behind both upload routes
    pub ingest: Arc<IngestService>,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last ingestion error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, ingest: IngestService, max_upload_bytes: usize) -> Self {
        Self {
            db,
            ingest: Arc::new(ingest),
            max_upload_bytes,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::upload_routes(state.max_upload_bytes))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
