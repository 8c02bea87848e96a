//! Error mapping for arms-ri
//!
//! Ingestion failures surface with fixed messages; the cause is logged.

use tracing::error;

pub use arms_common::api::{ApiError, ApiResult};

use crate::ingest::IngestError;

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InputMissing => ApiError::BadRequest("File not found".to_string()),
            IngestError::ExtractionFailed(detail) => {
                error!(detail = %detail, "Result extraction failed");
                ApiError::Internal("Failed to extract result data".to_string())
            }
            other => {
                error!(error = %other, "Result transaction failed");
                ApiError::Internal("Transaction failed".to_string())
            }
        }
    }
}
