//! `ingsync run` and `ingsync validate`.

use std::path::{Path, PathBuf};

use ingsync_io::{execute, load_lookup_table, RunOptions};
use ingsync_recon::{ConfigFormat, SyncConfig};

use crate::CliError;

/// Command-line paths that take precedence over the config file. Relative
/// values stay relative to the working directory.
#[derive(Debug, Default)]
pub struct PathOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Read, parse and validate `path`, resolving relative paths against its
/// directory.
pub fn load_config(path: &Path) -> Result<SyncConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::usage(format!("cannot read config {}: {e}", path.display()))
            .with_hint("pass the config path, e.g. `ingsync run path/to/config.json`")
    })?;

    let mut config = SyncConfig::parse(&text, ConfigFormat::from_path(path))
        .map_err(|e| CliError::from(e).with_hint(format!("in {}", path.display())))?;

    let base_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    config.resolve_paths(base_dir);
    tracing::debug!(config = %path.display(), "config loaded");
    Ok(config)
}

fn apply_overrides(config: &mut SyncConfig, overrides: PathOverrides) {
    if let Some(input) = overrides.input {
        config.xml_input = Some(input);
    }
    if let Some(output) = overrides.output {
        config.xml_output = output;
    }
    if let Some(log_dir) = overrides.log_dir {
        config.log_dir = log_dir;
    }
}

pub fn cmd_run(
    config_path: &Path,
    overrides: PathOverrides,
    json: bool,
    dry_run: bool,
) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, overrides);

    let report = execute(&config, &RunOptions { dry_run })?;

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(json_error)?;
        println!("{out}");
    } else {
        println!("{}", report.summary);
    }
    Ok(())
}

fn json_error(err: serde_json::Error) -> CliError {
    CliError::internal(format!("JSON serialization error: {err}"))
}

pub fn cmd_validate(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let table = load_lookup_table(&config)?;
    println!(
        "ok: {} entries, {} ambiguous codes ({} policy)",
        table.len(),
        table.ambiguous_codes().len(),
        config.duplicate_codes
    );
    Ok(())
}
