//! Subject normalization: applies the backlog and credit policy to one raw
//! observation.

use arms_common::records::{is_backlog, Subject, BACKLOG_GRADE};

use super::payload::{RawSubjectMarks, SchemeSubject};
use super::resolver::ResolvedSubject;

/// Produce the canonical subject record for one resolved observation
///
/// A backlog (total ≤ 39) earns no credit and is always graded "F",
/// whatever grade was extracted. Passing grades are kept verbatim.
pub fn normalize_subject(resolved: ResolvedSubject<'_>, marks: &RawSubjectMarks, reappear: bool) -> Subject {
    let scheme: &SchemeSubject = resolved.scheme;
    let total = marks.total;
    let backlog = is_backlog(total);

    Subject {
        paper_id: scheme.paper_id.clone(),
        paper_code: resolved.code.to_string(),
        paper_name: scheme.paper_name.clone(),
        kind: scheme.kind.clone(),
        credits: if backlog { 0 } else { scheme.credits },
        internal: marks.internal,
        external: marks.external,
        total,
        grade: if backlog {
            BACKLOG_GRADE.to_string()
        } else {
            marks.total_grade.clone().unwrap_or_default()
        },
        backlog,
        reappear,
    }
}
