//! Scheme reference index
//!
//! Built once per batch from the scheme payload and read-only afterwards.

use std::collections::HashMap;

use super::payload::{SchemeDocument, SchemeSubject};
use super::IngestError;

/// Lookup from paper code to scheme metadata, in scheme order
#[derive(Debug, Clone, Default)]
pub struct SchemeIndex {
    entries: Vec<(String, SchemeSubject)>,
    positions: HashMap<String, usize>,
}

impl SchemeIndex {
    pub fn new(entries: Vec<(String, SchemeSubject)>) -> Self {
        let mut index = Self::default();
        for (code, subject) in entries {
            match index.positions.get(&code) {
                Some(&pos) => index.entries[pos].1 = subject,
                None => {
                    index.positions.insert(code.clone(), index.entries.len());
                    index.entries.push((code, subject));
                }
            }
        }
        index
    }

    /// Build the index from the scheme payload
    ///
    /// Only the first scheme document is consulted; an empty payload means
    /// the parser produced nothing usable.
    pub fn from_documents(documents: Vec<SchemeDocument>) -> Result<Self, IngestError> {
        let first = documents.into_iter().next().ok_or_else(|| {
            IngestError::ExtractionFailed("scheme payload contains no documents".to_string())
        })?;
        Ok(Self::new(first.subjects.0))
    }

    /// Direct lookup by paper code
    pub fn get(&self, code: &str) -> Option<&SchemeSubject> {
        self.positions.get(code).map(|&pos| &self.entries[pos].1)
    }

    /// Direct lookup returning the stored key alongside the entry
    pub fn entry(&self, code: &str) -> Option<(&str, &SchemeSubject)> {
        self.positions.get(code).map(|&pos| {
            let (code, subject) = &self.entries[pos];
            (code.as_str(), subject)
        })
    }

    /// Entries in scheme order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemeSubject)> {
        self.entries.iter().map(|(code, subject)| (code.as_str(), subject))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
