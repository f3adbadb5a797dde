//! `ingsync-recon`: ingredient reconciliation engine.
//!
//! Pure engine crate: receives a lookup table and a parsed product document,
//! mutates the document and returns counters. File access lives in
//! `ingsync-io`.

pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod lookup;
pub mod matcher;
pub mod model;
pub mod parse;
pub mod reconcile;
pub mod tree;

pub use config::{ConfigFormat, DuplicatePolicy, SyncConfig};
pub use engine::run;
pub use error::{DataSourceError, ReconError};
pub use log::{MemoryLog, OutcomeLog};
pub use lookup::LookupTable;
pub use model::{LookupEntry, Outcome, RunCounters, RunSummary};
pub use parse::parse_document;
pub use tree::{Document, Element, ExpandedName, Node};
