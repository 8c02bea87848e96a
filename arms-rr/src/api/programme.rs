//! Programme results
//!
//! GET /api/v1/programme/:programme/:batch

use arms_common::api::{ApiError, ApiResponse, ApiResult};
use arms_common::db::{search_students, StudentFilter};
use axum::extract::{Path, State};

use crate::programmes::{batch_has_results, programme_code, valid_options};
use crate::summary::StudentSummary;
use crate::AppState;

/// GET /api/v1/programme/:programme/:batch
///
/// Every student of the programme and batch, with summaries.
pub async fn get_programme_result(
    State(state): State<AppState>,
    Path((programme, batch)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Vec<StudentSummary>>> {
    if programme.trim().is_empty() {
        return Err(ApiError::BadRequest("Programme parameter cannot be empty".to_string()));
    }
    if batch.trim().is_empty() {
        return Err(ApiError::BadRequest("Batch parameter cannot be empty".to_string()));
    }

    let programme = programme.trim().to_lowercase();
    let batch = batch.trim();

    let prg_code = programme_code(&programme).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid programme {}. Valid options are: {}",
            programme,
            valid_options()
        ))
    })?;

    if !batch_has_results(batch) {
        return Err(ApiError::NotFound(format!(
            "No result data available for batch {}",
            batch
        )));
    }

    let filter = StudentFilter {
        name_contains: None,
        prg_code: Some(prg_code.to_string()),
        batch: Some(batch.to_string()),
    };
    let mut conn = state.db.acquire().await.map_err(arms_common::Error::from)?;
    let students: Vec<StudentSummary> = search_students(&mut conn, &filter)
        .await?
        .into_iter()
        .map(StudentSummary::from)
        .collect();

    if students.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No students found for programme {} in batch {}",
            programme, batch
        )));
    }

    Ok(ApiResponse::ok(
        format!(
            "Fetched {} student(s) for programme \"{}\" in batch {}",
            students.len(),
            programme,
            batch
        ),
        students,
    ))
}
