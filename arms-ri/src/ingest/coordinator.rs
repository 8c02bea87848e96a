//! Batch transaction coordinator
//!
//! Applies one extraction to the record store inside a single transaction.
//! Students are processed sequentially; any error rolls back every write
//! staged for the batch.

use arms_common::config::MergeConfig;
use arms_common::db;
use arms_common::records::{Semester, Subject};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::aggregate::SemesterAggregator;
use super::gateway::Extraction;
use super::merge::{merge_fresh, merge_reappear, FreshMerge};
use super::normalize::normalize_subject;
use super::payload::{SchemeSubject, StudentResultRecord};
use super::resolver::resolve_subject;
use super::scheme::SchemeIndex;
use super::{IngestError, IngestMode};
use crate::utils::begin_monitored;

/// What happened to one student of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StudentOutcome {
    /// New student stored with its first semester
    Created,
    /// Semester appended to an existing student at position `seq`
    Appended { seq: i64 },
    /// Stored semesters with this number were patched
    Patched { semesters: usize, applied: usize, dropped: usize },
    /// Correction for an enrollment with no stored record
    NoMatchingRecord,
    /// Correction for a semester the student does not hold
    NoMatchingSemester,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub enrollment: String,
    pub sem: u32,
    #[serde(flatten)]
    pub outcome: StudentOutcome,
}

/// Per-student outcomes of a committed batch, in extraction order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub students: Vec<StudentReport>,
}

impl BatchReport {
    pub fn count(&self, pred: impl Fn(&StudentOutcome) -> bool) -> usize {
        self.students.iter().filter(|s| pred(&s.outcome)).count()
    }
}

pub struct BatchCoordinator {
    pool: SqlitePool,
    policy: MergeConfig,
}

impl BatchCoordinator {
    pub fn new(pool: SqlitePool, policy: MergeConfig) -> Self {
        Self { pool, policy }
    }

    /// Merge every extracted record, committing all of them or none
    pub async fn run(&self, mode: IngestMode, extraction: &Extraction) -> Result<BatchReport, IngestError> {
        info!(mode = %mode, students = extraction.records.len(), "Batch started");

        let mut tx = begin_monitored(&self.pool, "coordinator::run").await?;

        let outcome = self.process(tx.conn(), mode, extraction).await;
        match outcome {
            Ok(report) => {
                tx.commit().await?;
                info!(
                    mode = %mode,
                    students = report.students.len(),
                    created = report.count(|o| matches!(o, StudentOutcome::Created)),
                    appended = report.count(|o| matches!(o, StudentOutcome::Appended { .. })),
                    patched = report.count(|o| matches!(o, StudentOutcome::Patched { .. })),
                    unmatched = report.count(|o| {
                        matches!(o, StudentOutcome::NoMatchingRecord | StudentOutcome::NoMatchingSemester)
                    }),
                    "Batch committed"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(mode = %mode, error = %e, "Batch rolled back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        conn: &mut SqliteConnection,
        mode: IngestMode,
        extraction: &Extraction,
    ) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();

        for record in &extraction.records {
            let outcome = match mode {
                IngestMode::Fresh => self.apply_fresh(conn, record, &extraction.scheme).await?,
                IngestMode::Reappear => self.apply_reappear(conn, record, &extraction.scheme).await?,
            };
            debug!(
                enrollment = %record.enrollment,
                sem = record.result_header.sem,
                outcome = ?outcome,
                "Student merged"
            );
            report.students.push(StudentReport {
                enrollment: record.enrollment.clone(),
                sem: record.result_header.sem,
                outcome,
            });
        }

        Ok(report)
    }

    async fn apply_fresh(
        &self,
        conn: &mut SqliteConnection,
        record: &StudentResultRecord,
        scheme: &SchemeIndex,
    ) -> Result<StudentOutcome, IngestError> {
        let semester = build_semester(record, scheme)?;
        let existing = db::load_student(conn, &record.enrollment).await?;

        match merge_fresh(existing.as_ref(), record, semester, &self.policy)? {
            FreshMerge::Create(student) => {
                db::insert_student(conn, &student).await?;
                Ok(StudentOutcome::Created)
            }
            FreshMerge::Append(semester) => {
                let seq = db::append_semester(conn, &record.enrollment, &semester).await?;
                Ok(StudentOutcome::Appended { seq })
            }
        }
    }

    async fn apply_reappear(
        &self,
        conn: &mut SqliteConnection,
        record: &StudentResultRecord,
        scheme: &SchemeIndex,
    ) -> Result<StudentOutcome, IngestError> {
        let corrections: Vec<Subject> = resolve_record(record, scheme, true)?
            .into_iter()
            .map(|(subject, _)| subject)
            .collect();

        let Some(student) = db::load_student(conn, &record.enrollment).await? else {
            return Ok(StudentOutcome::NoMatchingRecord);
        };

        let patches = merge_reappear(
            &student,
            record.result_header.sem,
            &corrections,
            self.policy.reappear_credit_update,
        )?;
        if patches.is_empty() {
            return Ok(StudentOutcome::NoMatchingSemester);
        }

        let mut applied = 0;
        let mut dropped = 0;
        for (pos, patch) in &patches {
            applied += patch.applied;
            dropped = dropped.max(patch.dropped);
            if patch.is_changed() {
                db::replace_semester(conn, &student.enrollment, *pos as i64, &patch.semester).await?;
            }
        }

        Ok(StudentOutcome::Patched {
            semesters: patches.len(),
            applied,
            dropped,
        })
    }
}

/// Resolve and normalize every subject of a record, in document order
///
/// Fails on the first subject key the scheme cannot resolve.
fn resolve_record<'s>(
    record: &StudentResultRecord,
    scheme: &'s SchemeIndex,
    reappear: bool,
) -> Result<Vec<(Subject, &'s SchemeSubject)>, IngestError> {
    record
        .subjects
        .iter()
        .map(|(key, marks)| {
            let resolved = resolve_subject(key, scheme).ok_or_else(|| IngestError::ResolutionFailed {
                enrollment: record.enrollment.clone(),
                subject_key: key.to_string(),
            })?;
            Ok((normalize_subject(resolved, marks, reappear), resolved.scheme))
        })
        .collect()
}

/// Compute a fresh semester from a record
pub fn build_semester(record: &StudentResultRecord, scheme: &SchemeIndex) -> Result<Semester, IngestError> {
    let mut aggregator = SemesterAggregator::new(record.result_header.sem);
    for (subject, scheme_subject) in resolve_record(record, scheme, false)? {
        aggregator.push(subject, scheme_subject)?;
    }
    aggregator.finish()
}
