use crate::error::ReconError;

/// Destination for the two per-run outcome streams.
///
/// Passed explicitly into the driver and reconciler; the caller owns its
/// lifecycle.
pub trait OutcomeLog {
    /// A record's code has no row in the lookup table.
    fn record_not_found(&mut self, code: &str) -> Result<(), ReconError>;

    /// An existing field value was replaced.
    fn record_override(&mut self, original: &str, replacement: &str) -> Result<(), ReconError>;
}

pub fn not_found_message(code: &str) -> String {
    format!("Not found for {code}")
}

pub fn override_message(original: &str, replacement: &str) -> String {
    format!("Changed ORIGINAL: {original} TO: {replacement}")
}

/// Collects outcomes in memory. Used for dry runs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryLog {
    pub not_found: Vec<String>,
    pub overrides: Vec<(String, String)>,
}

impl MemoryLog {
    pub fn is_empty(&self) -> bool {
        self.not_found.is_empty() && self.overrides.is_empty()
    }
}

impl OutcomeLog for MemoryLog {
    fn record_not_found(&mut self, code: &str) -> Result<(), ReconError> {
        self.not_found.push(code.to_string());
        Ok(())
    }

    fn record_override(&mut self, original: &str, replacement: &str) -> Result<(), ReconError> {
        self.overrides
            .push((original.to_string(), replacement.to_string()));
        Ok(())
    }
}
