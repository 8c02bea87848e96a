//! Result upload endpoints
//!
//! POST  /api/v1/result/upload           fresh upload
//! PATCH /api/v1/result/reappear/upload  reappear corrections
//!
//! Both take a multipart body whose `file` field carries the result document.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::{patch, post},
    Router,
};
use arms_common::api::ApiResponse;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::ingest::{IngestMode, UploadedDocument};
use crate::AppState;

/// Multipart field holding the document
pub const UPLOAD_FIELD: &str = "file";

/// POST /api/v1/result/upload
pub async fn upload_result(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    let records = run_ingest(&state, IngestMode::Fresh, multipart).await?;
    Ok(ApiResponse::ok("Result data processed and saved successfully", records))
}

/// PATCH /api/v1/result/reappear/upload
pub async fn upload_reappear_result(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<ApiResponse<Vec<Value>>> {
    let records = run_ingest(&state, IngestMode::Reappear, multipart).await?;
    Ok(ApiResponse::ok("Result data processed and updated successfully", records))
}

async fn run_ingest(
    state: &AppState,
    mode: IngestMode,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<Value>> {
    let document = match multipart {
        Ok(multipart) => read_document(multipart).await?,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Upload is not a multipart body");
            None
        }
    };

    match state.ingest.ingest(mode, document).await {
        Ok(records) => Ok(records),
        Err(e) => {
            *state.last_error.write().await = Some(e.to_string());
            Err(ApiError::from(e))
        }
    }
}

/// Pull the `file` field out of the multipart body, if present
async fn read_document(mut multipart: Multipart) -> ApiResult<Option<UploadedDocument>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;

        return Ok(Some(UploadedDocument {
            file_name,
            bytes: bytes.to_vec(),
        }));
    }

    Ok(None)
}

/// Unreadable multipart bodies answer like a missing file, except oversize
/// uploads which keep their 413
fn multipart_error(e: MultipartError) -> ApiError {
    debug!(status = %e.status(), reason = %e.body_text(), "Multipart body unreadable");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".to_string())
    } else {
        ApiError::BadRequest("File not found".to_string())
    }
}

/// Build upload routes with the configured body limit
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/v1/result/upload", post(upload_result))
        .route("/api/v1/result/reappear/upload", patch(upload_reappear_result))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
