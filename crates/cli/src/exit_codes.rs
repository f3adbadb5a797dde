//! CLI Exit Code Registry
//!
//! Single source of truth for `ingsync` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage or configuration error                         |
//! | 3    | I/O error (input, output or log files)               |
//! | 4    | XML parse error                                      |
//! | 60   | Lookup source error (file, sheet, column, ambiguity) |
//! | 61   | Product record without a code field                  |
//! | 62   | Products container missing                           |
//!
//! A new code needs a constant here, a row in the table and a mapping in
//! [`exit_code_for`].

use ingsync_recon::ReconError;

pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments, unreadable or invalid configuration.
pub const EXIT_USAGE: u8 = 2;

pub const EXIT_IO: u8 = 3;

pub const EXIT_XML_PARSE: u8 = 4;

// =============================================================================
// Reconciliation (60-69)
// =============================================================================

/// Lookup source missing, unreadable, without the sheet or columns, or
/// rejected for an ambiguous code.
pub const EXIT_DATA_SOURCE: u8 = 60;

/// A product record has no code child. Nothing was written.
pub const EXIT_MALFORMED_RECORD: u8 = 61;

/// The document root has no products container.
pub const EXIT_MISSING_CONTAINER: u8 = 62;

pub fn exit_code_for(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_USAGE,
        ReconError::Io(_) => EXIT_IO,
        ReconError::Xml(_) => EXIT_XML_PARSE,
        ReconError::DataSource(_) => EXIT_DATA_SOURCE,
        ReconError::MalformedRecord { .. } => EXIT_MALFORMED_RECORD,
        ReconError::MissingContainer { .. } => EXIT_MISSING_CONTAINER,
    }
}
