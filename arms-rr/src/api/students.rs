//! Student lookups
//!
//! GET /api/v1/student/:enrollment
//! GET /api/v1/student/search-by-name?name=&programme=

use arms_common::api::{ApiError, ApiResponse, ApiResult};
use arms_common::db::{load_student, search_students, StudentFilter};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::programmes::{programme_code, valid_options};
use crate::summary::{StudentIdentity, StudentSummary};
use crate::AppState;

/// Enrollment numbers are exactly this long
pub const ENROLLMENT_LEN: usize = 11;

/// GET /api/v1/student/:enrollment
///
/// Returns the student with every semester and the cross-semester summary.
pub async fn get_student(
    State(state): State<AppState>,
    Path(enrollment): Path<String>,
) -> ApiResult<ApiResponse<StudentSummary>> {
    let trimmed = enrollment.trim();
    if trimmed.chars().count() != ENROLLMENT_LEN {
        return Err(ApiError::BadRequest(format!(
            "Invalid enrollment number: '{}'",
            enrollment
        )));
    }

    let mut conn = state.db.acquire().await.map_err(arms_common::Error::from)?;
    let student = load_student(&mut conn, trimmed).await?.ok_or_else(|| {
        ApiError::NotFound(format!(
            "No student found with enrollment number '{}'",
            trimmed
        ))
    })?;

    Ok(ApiResponse::ok(
        format!("Fetched data for student with enrollment '{}'", trimmed),
        StudentSummary::from(student),
    ))
}

/// Query parameters for name search
#[derive(Debug, Default, Deserialize)]
pub struct NameSearchQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub programme: String,
}

/// GET /api/v1/student/search-by-name
///
/// Case-insensitive substring match on the name, optionally narrowed to one
/// programme. Returns identity fields only.
pub async fn search_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameSearchQuery>,
) -> ApiResult<ApiResponse<Vec<StudentIdentity>>> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "`name` query parameter is required".to_string(),
        ));
    }

    let programme = query.programme.trim();
    let prg_code = if programme.is_empty() {
        None
    } else {
        let code = programme_code(programme).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Invalid programme '{}'. Valid options: {}",
                query.programme,
                valid_options()
            ))
        })?;
        Some(code.to_string())
    };

    let filter = StudentFilter {
        name_contains: Some(name.to_string()),
        prg_code,
        batch: None,
    };
    let mut conn = state.db.acquire().await.map_err(arms_common::Error::from)?;
    let students: Vec<StudentIdentity> = search_students(&mut conn, &filter)
        .await?
        .iter()
        .map(StudentIdentity::from)
        .collect();

    let scope = if query.programme.is_empty() {
        String::new()
    } else {
        format!(" in programme '{}'", programme)
    };

    if students.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No students found matching '{}'{}.",
            name, scope
        )));
    }

    Ok(ApiResponse::ok(
        format!("Found {} student(s) matching '{}'{}.", students.len(), name, scope),
        students,
    ))
}
