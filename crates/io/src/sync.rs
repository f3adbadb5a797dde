//! One full run: lookup table, document, reconciliation, output.

use std::path::PathBuf;

use serde::Serialize;

use ingsync_recon::{MemoryLog, OutcomeLog, ReconError, RunSummary, SyncConfig};

use crate::logs::RunLogs;
use crate::source::load_lookup_table;
use crate::xml::{read_document, write_document};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reconcile and report, but write neither the output tree nor log files.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub lookup_entries: usize,
    pub ambiguous_codes: usize,
    /// `None` on a dry run.
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub run_at: String,
}

/// Execute a complete pass described by `config`.
///
/// Fails before touching the logs when the lookup table cannot be built. A
/// failure during reconciliation leaves no output file.
pub fn execute(config: &SyncConfig, options: &RunOptions) -> Result<SyncReport, ReconError> {
    let input = config.xml_input.as_deref().ok_or_else(|| {
        ReconError::ConfigValidation("no XML input given (set `xml_input` or pass --input)".into())
    })?;

    let table = load_lookup_table(config)?;
    let mut document = read_document(input)?;

    let summary = if options.dry_run {
        let mut log = MemoryLog::default();
        let summary = reconcile(config, &table, &mut document, &mut log)?;
        tracing::info!(
            not_found = log.not_found.len(),
            overrides = log.overrides.len(),
            "dry run, nothing written"
        );
        summary
    } else {
        let mut logs = RunLogs::open(&config.log_dir)?;
        let summary = reconcile(config, &table, &mut document, &mut logs)?;
        logs.finish()?;
        write_document(&document, &config.xml_output)?;
        tracing::info!(output = %config.xml_output.display(), "output written");
        summary
    };

    Ok(SyncReport {
        summary,
        lookup_entries: table.len(),
        ambiguous_codes: table.ambiguous_codes().len(),
        output: (!options.dry_run).then(|| config.xml_output.clone()),
        dry_run: options.dry_run,
        run_at: chrono::Utc::now().to_rfc3339(),
    })
}

fn reconcile(
    config: &SyncConfig,
    table: &ingsync_recon::LookupTable,
    document: &mut ingsync_recon::Document,
    log: &mut dyn OutcomeLog,
) -> Result<RunSummary, ReconError> {
    let summary = ingsync_recon::run(config, table, document, log)?;
    tracing::info!(
        not_found = summary.counters.not_found,
        updated = summary.counters.updated,
        appended = summary.counters.appended,
        total = summary.total,
        "reconciliation complete"
    );
    Ok(summary)
}
