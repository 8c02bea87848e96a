//! Result ingestion engine
//!
//! Extracted transcript data flows through here into the record store:
//!
//! 1. The gateway extracts student records and the scheme from the uploaded
//!    document inside a per-batch workspace
//! 2. Each raw subject key is resolved against the scheme and normalized
//! 3. Fresh uploads aggregate a new semester; reappear uploads patch the
//!    stored one
//! 4. The coordinator commits the whole batch atomically
//!
//! The workspace is released on every exit path.

pub mod aggregate;
pub mod coordinator;
pub mod gateway;
pub mod grade;
pub mod merge;
pub mod normalize;
pub mod payload;
pub mod resolver;
pub mod scheme;
pub mod workspace;

pub use coordinator::{BatchCoordinator, BatchReport, StudentOutcome, StudentReport};
pub use gateway::{parse_extraction, Extraction, ExtractionGateway, ProcessGateway};
pub use payload::StudentResultRecord;
pub use workspace::BatchWorkspace;

use arms_common::config::MergeConfig;
use serde_json::Value;
use sqlx::SqlitePool;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Which merge path an upload takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// First-pass upload: create the student or append a semester
    Fresh,
    /// Correction upload: patch subjects of a stored semester
    Reappear,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Fresh => f.write_str("fresh"),
            IngestMode::Reappear => f.write_str("reappear"),
        }
    }
}

/// Ingestion failures
#[derive(Debug, Error)]
pub enum IngestError {
    /// No document was uploaded
    #[error("no result document supplied")]
    InputMissing,

    /// Parser failed or produced unusable output
    #[error("result extraction failed: {0}")]
    ExtractionFailed(String),

    /// Subject key matched neither a scheme code nor a paper identifier
    #[error("subject '{subject_key}' of {enrollment} matches no scheme entry")]
    ResolutionFailed { enrollment: String, subject_key: String },

    /// Semester already stored and the merge policy rejects duplicates
    #[error("semester {sem} of {enrollment} is already stored")]
    DuplicateSemester { enrollment: String, sem: u32 },

    /// Store error while the batch transaction was open
    #[error("transaction failed: {0}")]
    TransactionFailed(String),
}

impl From<arms_common::Error> for IngestError {
    fn from(e: arms_common::Error) -> Self {
        IngestError::TransactionFailed(e.to_string())
    }
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        IngestError::TransactionFailed(e.to_string())
    }
}

/// An uploaded result document
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Entry point shared by both upload routes
pub struct IngestService {
    gateway: Arc<dyn ExtractionGateway>,
    coordinator: BatchCoordinator,
    temp_root: PathBuf,
}

impl IngestService {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn ExtractionGateway>,
        temp_root: PathBuf,
        policy: MergeConfig,
    ) -> Self {
        Self {
            gateway,
            coordinator: BatchCoordinator::new(pool, policy),
            temp_root,
        }
    }

    /// Ingest one uploaded document
    ///
    /// Returns the parsed student records, as the parser wrote them, once
    /// the batch has committed.
    pub async fn ingest(
        &self,
        mode: IngestMode,
        document: Option<UploadedDocument>,
    ) -> Result<Vec<Value>, IngestError> {
        let document = document.ok_or(IngestError::InputMissing)?;

        let workspace = BatchWorkspace::acquire(&self.temp_root)
            .await
            .map_err(|e| IngestError::ExtractionFailed(format!("cannot create batch workspace: {}", e)))?;

        let result = self.ingest_in(&workspace, mode, &document).await;

        if let Err(e) = workspace.release().await {
            warn!(error = %e, "Failed to remove batch workspace");
        }

        result
    }

    async fn ingest_in(
        &self,
        workspace: &BatchWorkspace,
        mode: IngestMode,
        document: &UploadedDocument,
    ) -> Result<Vec<Value>, IngestError> {
        info!(
            mode = %mode,
            file = document.file_name.as_deref().unwrap_or("<unnamed>"),
            bytes = document.bytes.len(),
            "Result document received"
        );

        tokio::fs::write(workspace.document_path(), &document.bytes)
            .await
            .map_err(|e| IngestError::ExtractionFailed(format!("cannot store uploaded document: {}", e)))?;

        let extraction = self.gateway.extract(workspace).await?;
        self.coordinator.run(mode, &extraction).await?;

        Ok(extraction.raw_records)
    }
}
