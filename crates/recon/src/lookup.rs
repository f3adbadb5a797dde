//! Lookup table builder: raw `(code, ingredients)` rows in, deduplicated
//! code-indexed table out.

use std::collections::{HashMap, HashSet};

use crate::config::DuplicatePolicy;
use crate::error::{DataSourceError, ReconError};
use crate::model::LookupEntry;

#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
    /// Code -> index of its first entry.
    index: HashMap<String, usize>,
    /// Codes with more than one distinct ingredients value, first-seen order.
    ambiguous: Vec<String>,
}

impl LookupTable {
    /// Build from source rows in sheet order.
    ///
    /// Rows identical in both fields collapse to their first occurrence.
    /// Rows with a blank code cannot be joined and are dropped.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut seen: HashSet<LookupEntry> = HashSet::new();
        let mut table = LookupTable::default();

        for (code, ingredients) in rows {
            if code.trim().is_empty() {
                continue;
            }
            let entry = LookupEntry::new(code, ingredients);
            if !seen.insert(entry.clone()) {
                continue;
            }

            if table.index.contains_key(&entry.code) {
                if !table.ambiguous.contains(&entry.code) {
                    table.ambiguous.push(entry.code.clone());
                }
            } else {
                table.index.insert(entry.code.clone(), table.entries.len());
            }
            table.entries.push(entry);
        }

        table
    }

    /// Apply the configured duplicate-code policy.
    pub fn with_policy(self, policy: DuplicatePolicy) -> Result<Self, ReconError> {
        match policy {
            DuplicatePolicy::First => Ok(self),
            DuplicatePolicy::Warn => {
                for code in &self.ambiguous {
                    tracing::warn!(
                        code = %code,
                        candidates = self.candidates(code).count(),
                        "ambiguous code, first row wins"
                    );
                }
                Ok(self)
            }
            DuplicatePolicy::Reject => {
                if let Some(code) = self.ambiguous.first() {
                    return Err(DataSourceError::AmbiguousCode {
                        code: code.clone(),
                        candidates: self.candidates(code).count(),
                    }
                    .into());
                }
                Ok(self)
            }
        }
    }

    /// First entry for `code` in table order.
    pub fn get(&self, code: &str) -> Option<&LookupEntry> {
        self.index.get(code).map(|&i| &self.entries[i])
    }

    /// Every entry for `code`, in table order.
    pub fn candidates<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a LookupEntry> + 'a {
        self.entries.iter().filter(move |e| e.code == code)
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn ambiguous_codes(&self) -> &[String] {
        &self.ambiguous
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
