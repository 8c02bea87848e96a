//! Persisted academic record model
//!
//! A [`Student`] is the root aggregate, keyed externally by enrollment number.
//! It owns an ordered list of [`Semester`]s, each owning an ordered list of
//! [`Subject`]s. Field names serialize in the camelCase shape the upload and
//! review APIs expose.

use serde::{Deserialize, Serialize};

/// Passing threshold: a subject total must exceed this value to clear.
pub const BACKLOG_THRESHOLD: f64 = 39.0;

/// Grade recorded for every backlog subject
pub const BACKLOG_GRADE: &str = "F";

/// Student record (root aggregate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Unique enrollment number
    pub enrollment: String,
    pub name: String,
    /// Student identifier issued by the examining body
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(rename = "schemeID", default)]
    pub scheme_id: Option<String>,
    #[serde(default)]
    pub inst_code: Option<i64>,
    /// Batch (admission year)
    pub batch: String,
    #[serde(default)]
    pub prg_code: Option<String>,
    /// Programme name
    pub programme: String,
    #[serde(default)]
    pub semesters: Vec<Semester>,
}

impl Student {
    /// Indices of every stored semester with the given number
    ///
    /// Fresh uploads do not enforce uniqueness, so more than one may match.
    pub fn semester_positions(&self, sem: u32) -> Vec<usize> {
        self.semesters
            .iter()
            .enumerate()
            .filter(|(_, s)| s.sem == sem)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn has_semester(&self, sem: u32) -> bool {
        self.semesters.iter().any(|s| s.sem == sem)
    }
}

/// One semester of results with its derived aggregates
///
/// All sums are derived from `subjects`; they are recomputed on every merge
/// and never edited independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub sem: u32,
    pub subject_count: u32,
    pub subjects: Vec<Subject>,
    pub total_marks: f64,
    pub max_marks: u32,
    /// Credits actually awarded (backlogs contribute 0)
    pub total_credits: u32,
    /// Nominal credits of every subject present, pass or fail
    pub max_credits: u32,
    /// Sum of awarded credit × subject total
    pub total_credit_marks: f64,
    /// `max_credits × 100`
    pub max_credit_marks: u32,
    pub percentage: f64,
    pub credit_percentage: f64,
    pub sgpa: f64,
}

/// One subject outcome inside a semester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub paper_id: String,
    pub paper_code: String,
    pub paper_name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Awarded credits; always 0 for a backlog
    pub credits: u32,
    pub internal: f64,
    pub external: f64,
    pub total: f64,
    pub grade: String,
    pub backlog: bool,
    #[serde(default)]
    pub reappear: bool,
}

impl Subject {
    /// Contribution of this subject to a semester's credit marks
    pub fn credit_marks(&self) -> f64 {
        f64::from(self.credits) * self.total
    }
}

/// Whether a subject total counts as a backlog (total ≤ 39)
pub fn is_backlog(total: f64) -> bool {
    !(total > BACKLOG_THRESHOLD)
}
