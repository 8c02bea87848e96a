//! Semester aggregation
//!
//! Folds canonical subjects into semester totals, percentages and SGPA.
//! Rounded figures are stored at three decimals, ties rounding away from zero
//! on the exact binary value.

use arms_common::records::{Semester, Subject};

use super::grade::grade_points;
use super::payload::SchemeSubject;
use super::IngestError;

/// Decimal places kept for percentages and SGPA
pub const ROUNDING_PLACES: usize = 3;

/// Round to `places` decimals, ties away from zero on the exact value
///
/// The exact decimal expansion of `value` is inspected, so values such as
/// 1.0005 (stored as 1.000499…) round down while exact ties such as 0.0625
/// round up.
pub fn round_half_up(value: f64, places: usize) -> f64 {
    if !value.is_finite() || value.abs() >= 1e21 {
        return value;
    }

    // Every double in this range has a terminating expansion within 1074
    // digits, but anything below 2^-11 cannot sit on a third-decimal tie,
    // so 64 fractional digits are exact wherever it matters.
    let exact = format!("{:.64}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let kept = &frac_part[..places.min(frac_part.len())];
    let round_up = frac_part
        .as_bytes()
        .get(places)
        .map(|digit| *digit >= b'5')
        .unwrap_or(false);

    let scale = 10u128.pow(places as u32);
    let mut scaled: u128 = format!("{}{}", int_part, kept).parse().unwrap_or(0);
    if round_up {
        scaled += 1;
    }

    let text = if places == 0 {
        scaled.to_string()
    } else {
        format!("{}.{:0width$}", scaled / scale, scaled % scale, width = places)
    };
    let rounded: f64 = text.parse().unwrap_or(0.0);

    if value < 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// `total / max × 100` at three decimals; 0 when `max` is 0
pub fn percentage(total: f64, max: f64) -> f64 {
    if max == 0.0 {
        return 0.0;
    }
    round_half_up(total / max * 100.0, ROUNDING_PLACES)
}

/// Credit-weighted grade point average over the semester's nominal credits
///
/// Each subject contributes `grade points × awarded credits`, so backlogs add
/// nothing to the numerator while still counting in `max_credits`.
pub fn sgpa(subjects: &[Subject], max_credits: u32) -> f64 {
    let total_points: u64 = subjects
        .iter()
        .map(|s| u64::from(grade_points(&s.grade)) * u64::from(s.credits))
        .sum();

    if total_points == 0 || max_credits == 0 {
        return 0.0;
    }
    round_half_up(total_points as f64 / f64::from(max_credits), ROUNDING_PLACES)
}

/// Accumulates one semester's subjects in extraction order
#[derive(Debug, Clone)]
pub struct SemesterAggregator {
    sem: u32,
    subjects: Vec<Subject>,
    total_marks: f64,
    max_marks: u32,
    total_credits: u32,
    max_credits: u32,
    total_credit_marks: f64,
}

impl SemesterAggregator {
    pub fn new(sem: u32) -> Self {
        Self {
            sem,
            subjects: Vec::new(),
            total_marks: 0.0,
            max_marks: 0,
            total_credits: 0,
            max_credits: 0,
            total_credit_marks: 0.0,
        }
    }

    /// Add a normalized subject with the scheme entry it resolved to
    ///
    /// Max marks and max credits come from the scheme regardless of backlog.
    /// Scheme values whose sums leave the `u32` range are rejected.
    pub fn push(&mut self, subject: Subject, scheme: &SchemeSubject) -> Result<(), IngestError> {
        let sem = self.sem;
        self.max_marks = checked_sum(sem, "max marks", self.max_marks, scheme.max_marks)?;
        self.total_credits = checked_sum(sem, "credits", self.total_credits, subject.credits)?;
        self.max_credits = checked_sum(sem, "max credits", self.max_credits, scheme.credits)?;
        self.total_marks += subject.total;
        self.total_credit_marks += subject.credit_marks();
        self.subjects.push(subject);
        Ok(())
    }

    pub fn finish(self) -> Result<Semester, IngestError> {
        let max_credit_marks = max_credit_marks(self.sem, self.max_credits)?;
        let sgpa = sgpa(&self.subjects, self.max_credits);

        Ok(Semester {
            sem: self.sem,
            subject_count: self.subjects.len() as u32,
            total_marks: self.total_marks,
            max_marks: self.max_marks,
            total_credits: self.total_credits,
            max_credits: self.max_credits,
            total_credit_marks: self.total_credit_marks,
            max_credit_marks,
            percentage: percentage(self.total_marks, f64::from(self.max_marks)),
            credit_percentage: percentage(self.total_credit_marks, f64::from(max_credit_marks)),
            sgpa,
            subjects: self.subjects,
        })
    }
}

/// `u32` addition for semester sums, failing the batch on overflow
pub fn checked_sum(sem: u32, what: &str, acc: u32, value: u32) -> Result<u32, IngestError> {
    acc.checked_add(value).ok_or_else(|| out_of_range(sem, what))
}

/// Highest credit marks a semester can hold (`max credits × 100`)
pub fn max_credit_marks(sem: u32, max_credits: u32) -> Result<u32, IngestError> {
    max_credits
        .checked_mul(100)
        .ok_or_else(|| out_of_range(sem, "max credit marks"))
}

fn out_of_range(sem: u32, what: &str) -> IngestError {
    IngestError::ExtractionFailed(format!("semester {} {} out of range", sem, what))
}
