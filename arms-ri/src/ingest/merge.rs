//! Record merging
//!
//! Pure reducers deciding how an incoming semester lands on a stored
//! student. Nothing here touches storage; the batch coordinator persists the
//! returned values.

use arms_common::config::{CreditUpdateMode, MergeConfig};
use arms_common::records::{Semester, Student, Subject};

use super::aggregate::{checked_sum, percentage, sgpa};
use super::payload::StudentResultRecord;
use super::IngestError;

/// Result of merging a fresh upload
#[derive(Debug, Clone, PartialEq)]
pub enum FreshMerge {
    /// Unknown enrollment: a new student holding only this semester
    Create(Student),
    /// Known enrollment: the semester goes after the stored ones
    Append(Semester),
}

/// Merge a freshly computed semester into the stored student, if any
///
/// Stored semesters and subjects are never modified. A semester number that
/// is already stored is appended again unless the merge policy rejects
/// duplicates.
pub fn merge_fresh(
    existing: Option<&Student>,
    record: &StudentResultRecord,
    semester: Semester,
    policy: &MergeConfig,
) -> Result<FreshMerge, IngestError> {
    match existing {
        None => Ok(FreshMerge::Create(new_student(record, semester))),
        Some(student) => {
            if policy.reject_duplicate_semesters && student.has_semester(semester.sem) {
                return Err(IngestError::DuplicateSemester {
                    enrollment: student.enrollment.clone(),
                    sem: semester.sem,
                });
            }
            Ok(FreshMerge::Append(semester))
        }
    }
}

fn new_student(record: &StudentResultRecord, semester: Semester) -> Student {
    Student {
        enrollment: record.enrollment.clone(),
        name: record.name.clone(),
        sid: record.sid.clone(),
        scheme_id: record.scheme_id.clone(),
        inst_code: record.institute.inst_code,
        batch: record.batch.clone(),
        prg_code: record.prg_code.clone(),
        programme: record.programme.clone(),
        semesters: vec![semester],
    }
}

/// A semester after corrections were applied
#[derive(Debug, Clone, PartialEq)]
pub struct SemesterPatch {
    pub semester: Semester,
    /// Stored subjects overwritten by a correction
    pub applied: usize,
    /// Corrections whose paper code matched no stored subject
    pub dropped: usize,
}

impl SemesterPatch {
    pub fn is_changed(&self) -> bool {
        self.applied > 0
    }
}

/// Apply reappear corrections to a stored semester
///
/// Each stored subject takes the first correction with the same paper code.
/// Totals are adjusted differentially; credit marks and awarded credits
/// follow `mode`. Percentages and SGPA are recomputed whenever anything
/// changed; max marks and max credits stay as stored. Corrections naming a
/// paper code the semester does not hold are dropped.
pub fn apply_corrections(
    prior: &Semester,
    corrections: &[Subject],
    mode: CreditUpdateMode,
) -> Result<SemesterPatch, IngestError> {
    let mut semester = prior.clone();
    let mut applied = 0;

    for idx in 0..semester.subjects.len() {
        let Some(update) = corrections
            .iter()
            .find(|c| c.paper_code == semester.subjects[idx].paper_code)
        else {
            continue;
        };

        let old = semester.subjects[idx].clone();

        semester.total_marks = semester.total_marks - old.total + update.total;
        semester.total_credit_marks = match mode {
            CreditUpdateMode::Additive => semester.total_credit_marks + update.credit_marks(),
            CreditUpdateMode::Differential => {
                semester.total_credit_marks - old.credit_marks() + update.credit_marks()
            }
        };
        semester.percentage = percentage(semester.total_marks, f64::from(semester.max_marks));
        semester.credit_percentage = percentage(
            semester.total_credit_marks,
            f64::from(semester.max_credit_marks),
        );

        let stored = &mut semester.subjects[idx];
        stored.internal = update.internal;
        stored.external = update.external;
        stored.total = update.total;
        stored.grade = update.grade.clone();
        stored.credits = update.credits;
        stored.backlog = update.backlog;
        stored.reappear = update.reappear;

        let base_credits = match mode {
            CreditUpdateMode::Additive => semester.total_credits,
            CreditUpdateMode::Differential => semester.total_credits.saturating_sub(old.credits),
        };
        semester.total_credits = checked_sum(semester.sem, "credits", base_credits, update.credits)?;
        semester.sgpa = sgpa(&semester.subjects, semester.max_credits);

        applied += 1;
    }

    let dropped = corrections
        .iter()
        .filter(|c| !prior.subjects.iter().any(|s| s.paper_code == c.paper_code))
        .count();

    Ok(SemesterPatch {
        semester,
        applied,
        dropped,
    })
}

/// Patch every stored semester whose number matches `sem`
///
/// Returns `(position, patch)` pairs in storage order; empty when the
/// student holds no such semester.
pub fn merge_reappear(
    student: &Student,
    sem: u32,
    corrections: &[Subject],
    mode: CreditUpdateMode,
) -> Result<Vec<(usize, SemesterPatch)>, IngestError> {
    student
        .semester_positions(sem)
        .into_iter()
        .map(|pos| Ok((pos, apply_corrections(&student.semesters[pos], corrections, mode)?)))
        .collect()
}
