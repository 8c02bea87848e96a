//! Parsing gateway
//!
//! Turns the uploaded document into student result records plus the scheme
//! they are graded against. The production gateway runs the external parser
//! as a child process; tests substitute their own implementation.

use arms_common::config::ExtractionConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::payload::{SchemeDocument, StudentResultRecord};
use super::scheme::SchemeIndex;
use super::workspace::BatchWorkspace;
use super::IngestError;

/// Structured output of one extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub records: Vec<StudentResultRecord>,
    /// The result payload exactly as the parser wrote it, one entry per record
    pub raw_records: Vec<Value>,
    pub scheme: SchemeIndex,
}

/// Extracts the document stored in a batch workspace
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn extract(&self, workspace: &BatchWorkspace) -> Result<Extraction, IngestError>;
}

/// Parse the two JSON payloads the parser writes
pub fn parse_extraction(result_json: &str, scheme_json: &str) -> Result<Extraction, IngestError> {
    let raw_records: Vec<Value> = serde_json::from_str(result_json)
        .map_err(|e| IngestError::ExtractionFailed(format!("invalid result payload: {}", e)))?;
    let records = raw_records
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            StudentResultRecord::deserialize(raw).map_err(|e| {
                IngestError::ExtractionFailed(format!("invalid result record {}: {}", idx, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let documents: Vec<SchemeDocument> = serde_json::from_str(scheme_json)
        .map_err(|e| IngestError::ExtractionFailed(format!("invalid scheme payload: {}", e)))?;
    let scheme = SchemeIndex::from_documents(documents)?;

    Ok(Extraction {
        records,
        raw_records,
        scheme,
    })
}

/// Gateway backed by the external parser program
///
/// Invoked as
/// `<program> <args...> -in <document> -sp -os <scheme.json> -or <result.json>`.
#[derive(Debug, Clone)]
pub struct ProcessGateway {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessGateway {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn command(&self, workspace: &BatchWorkspace) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-in")
            .arg(workspace.document_path())
            .arg("-sp")
            .arg("-os")
            .arg(workspace.scheme_output_path())
            .arg("-or")
            .arg(workspace.result_output_path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ExtractionGateway for ProcessGateway {
    async fn extract(&self, workspace: &BatchWorkspace) -> Result<Extraction, IngestError> {
        info!(program = %self.program, workspace = %workspace.path().display(), "Running result parser");

        // Dropping the output future on timeout kills the child
        let output = tokio::time::timeout(self.timeout, self.command(workspace).output())
            .await
            .map_err(|_| {
                IngestError::ExtractionFailed(format!(
                    "parser did not finish within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| IngestError::ExtractionFailed(format!("failed to start parser: {}", e)))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(target: "arms_ri::parser", "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(target: "arms_ri::parser", "{}", line);
        }

        if !output.status.success() {
            return Err(IngestError::ExtractionFailed(format!(
                "parser exited with {}",
                output.status
            )));
        }

        let result_json = tokio::fs::read_to_string(workspace.result_output_path())
            .await
            .map_err(|e| IngestError::ExtractionFailed(format!("cannot read result output: {}", e)))?;
        let scheme_json = tokio::fs::read_to_string(workspace.scheme_output_path())
            .await
            .map_err(|e| IngestError::ExtractionFailed(format!("cannot read scheme output: {}", e)))?;

        let extraction = parse_extraction(&result_json, &scheme_json)?;
        info!(
            students = extraction.records.len(),
            scheme_subjects = extraction.scheme.len(),
            "Result parser finished"
        );
        Ok(extraction)
    }
}
