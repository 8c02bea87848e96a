//! Subject code resolution
//!
//! Transcripts from different document layouts key a subject either by its
//! scheme paper code or by its internal paper identifier. Resolution tries
//! the code first, then falls back to a scan over paper identifiers.

use super::payload::SchemeSubject;
use super::scheme::SchemeIndex;

/// A raw subject key matched to its canonical scheme entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSubject<'a> {
    /// The scheme key the entry was found under (never the raw key itself
    /// when the match came from the paper-identifier fallback)
    pub code: &'a str,
    pub scheme: &'a SchemeSubject,
}

/// Resolve a raw extracted subject key against the scheme
///
/// Returns `None` when neither a scheme key nor a paper identifier matches.
pub fn resolve_subject<'a>(raw_key: &str, index: &'a SchemeIndex) -> Option<ResolvedSubject<'a>> {
    let key = raw_key.trim();

    if let Some((code, scheme)) = index.entry(key) {
        return Some(ResolvedSubject { code, scheme });
    }

    index
        .iter()
        .find(|(_, scheme)| scheme.paper_id == key)
        .map(|(code, scheme)| ResolvedSubject { code, scheme })
}
