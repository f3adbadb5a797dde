use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// One normalized row of the lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LookupEntry {
    pub code: String,
    /// Empty when the source cell was blank.
    pub ingredients: String,
}

impl LookupEntry {
    pub fn new(code: impl Into<String>, ingredients: Option<String>) -> Self {
        Self {
            code: code.into(),
            ingredients: ingredients.unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-record outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// No usable ingredients for the code; record untouched.
    NotFound,
    /// Field was absent and has been created.
    Appended,
    /// Field held a different value and was overwritten.
    Updated,
    /// Field already held the looked-up value.
    Unchanged,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Appended => write!(f, "appended"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

// ---------------------------------------------------------------------------
// Counters + Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub not_found: usize,
    pub updated: usize,
    pub appended: usize,
}

impl RunCounters {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::NotFound => self.not_found += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Appended => self.appended += 1,
            Outcome::Unchanged => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub counters: RunCounters,
    pub total: usize,
}

impl RunSummary {
    /// Records whose field already matched the lookup.
    pub fn unchanged(&self) -> usize {
        self.total
            - self.counters.not_found
            - self.counters.updated
            - self.counters.appended
    }
}

/// The four-line tally printed at the end of a run.
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - not found", self.counters.not_found)?;
        writeln!(f, "{} - updated", self.counters.updated)?;
        writeln!(f, "{} - appended", self.counters.appended)?;
        write!(f, "{} - Total", self.total)
    }
}
