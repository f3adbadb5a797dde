//! `ingsync-io`: file I/O around the reconciliation engine: lookup sources,
//! product documents, run logs.

pub mod logs;
pub mod source;
pub mod sync;
pub mod xml;

pub use logs::RunLogs;
pub use source::load_lookup_table;
pub use sync::{execute, RunOptions, SyncReport};
pub use xml::{read_document, write_document};
