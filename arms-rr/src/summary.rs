//! Read-side projections of stored students
//!
//! Cross-semester totals and the overall GPA are never stored; they are
//! computed here on every read.

use arms_common::{Semester, Student};
use serde::Serialize;

/// Identity fields returned by name search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentity {
    pub enrollment: String,
    pub name: String,
    pub sid: Option<String>,
    #[serde(rename = "schemeID")]
    pub scheme_id: Option<String>,
    pub inst_code: Option<i64>,
    pub batch: String,
    pub prg_code: Option<String>,
    pub programme: String,
}

impl From<&Student> for StudentIdentity {
    fn from(student: &Student) -> Self {
        Self {
            enrollment: student.enrollment.clone(),
            name: student.name.clone(),
            sid: student.sid.clone(),
            scheme_id: student.scheme_id.clone(),
            inst_code: student.inst_code,
            batch: student.batch.clone(),
            prg_code: student.prg_code.clone(),
            programme: student.programme.clone(),
        }
    }
}

/// A student with totals summed over every stored semester
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(flatten)]
    pub identity: StudentIdentity,
    pub total_marks: f64,
    pub max_marks: u64,
    pub total_credit_marks: f64,
    pub max_credit_marks: u64,
    pub total_credits: u64,
    pub max_credits: u64,
    pub semesters_count: usize,
    /// Mean of the stored semester SGPAs (unrounded); 0 without semesters
    pub gpa: f64,
    pub semesters: Vec<Semester>,
}

impl From<Student> for StudentSummary {
    fn from(student: Student) -> Self {
        let identity = StudentIdentity::from(&student);
        let semesters = student.semesters;

        let semesters_count = semesters.len();
        let gpa = if semesters_count > 0 {
            semesters.iter().map(|s| s.sgpa).sum::<f64>() / semesters_count as f64
        } else {
            0.0
        };

        Self {
            identity,
            total_marks: semesters.iter().map(|s| s.total_marks).sum(),
            max_marks: semesters.iter().map(|s| u64::from(s.max_marks)).sum(),
            total_credit_marks: semesters.iter().map(|s| s.total_credit_marks).sum(),
            max_credit_marks: semesters.iter().map(|s| u64::from(s.max_credit_marks)).sum(),
            total_credits: semesters.iter().map(|s| u64::from(s.total_credits)).sum(),
            max_credits: semesters.iter().map(|s| u64::from(s.max_credits)).sum(),
            semesters_count,
            gpa,
            semesters,
        }
    }
}
