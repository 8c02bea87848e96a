//! arms-rr library - Records Review service
//!
//! Read-only lookups over stored student records. Totals across semesters
//! and the overall GPA are computed per request.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod db;
pub mod programmes;
pub mod summary;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5741;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only)
    pub db: SqlitePool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/api/v1/student/search-by-name", get(api::search_by_name))
        .route("/api/v1/student/:enrollment", get(api::get_student))
        .route("/api/v1/programme/:programme/:batch", get(api::get_programme_result))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
