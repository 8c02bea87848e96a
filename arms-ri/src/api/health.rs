//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok" or "degraded")
    pub status: String,
    /// Module name ("arms-ri")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Stored student count, when the database answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<i64>,
    /// Last ingestion error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let students = match state.db.acquire().await {
        Ok(mut conn) => arms_common::db::count_students(&mut conn).await.ok(),
        Err(_) => None,
    };
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if students.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "arms-ri".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        students,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
