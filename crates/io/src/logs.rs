//! File-backed outcome logs: `not_founds.log` and `overrides.log`, truncated
//! at the start of every run.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ingsync_recon::log::{not_found_message, override_message};
use ingsync_recon::{OutcomeLog, ReconError};

pub const NOT_FOUND_LOG: &str = "not_founds";
pub const OVERRIDE_LOG: &str = "overrides";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// One named log file. Lines: `<timestamp> - <name> - <LEVEL> - <message>`.
pub struct LogStream {
    name: &'static str,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogStream {
    pub fn create(dir: &Path, name: &'static str) -> Result<Self, ReconError> {
        let path = dir.join(format!("{name}.log"));
        let file = File::create(&path)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", path.display())))?;
        Ok(Self {
            name,
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, level: Level, message: &str) -> Result<(), ReconError> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        writeln!(self.writer, "{timestamp} - {} - {level} - {message}", self.name)
            .map_err(|e| ReconError::Io(format!("cannot write {}: {e}", self.path.display())))
    }

    pub fn flush(&mut self) -> Result<(), ReconError> {
        self.writer
            .flush()
            .map_err(|e| ReconError::Io(format!("cannot flush {}: {e}", self.path.display())))
    }
}

/// Both run logs. Buffered lines reach disk on [`RunLogs::finish`] or drop.
pub struct RunLogs {
    not_found: LogStream,
    overrides: LogStream,
}

impl RunLogs {
    /// Create `dir` if needed and truncate both log files.
    pub fn open(dir: &Path) -> Result<Self, ReconError> {
        fs::create_dir_all(dir)
            .map_err(|e| ReconError::Io(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            not_found: LogStream::create(dir, NOT_FOUND_LOG)?,
            overrides: LogStream::create(dir, OVERRIDE_LOG)?,
        })
    }

    pub fn not_found_path(&self) -> &Path {
        self.not_found.path()
    }

    pub fn overrides_path(&self) -> &Path {
        self.overrides.path()
    }

    pub fn finish(mut self) -> Result<(), ReconError> {
        self.not_found.flush()?;
        self.overrides.flush()
    }
}

impl OutcomeLog for RunLogs {
    fn record_not_found(&mut self, code: &str) -> Result<(), ReconError> {
        self.not_found.write(Level::Info, &not_found_message(code))
    }

    fn record_override(&mut self, original: &str, replacement: &str) -> Result<(), ReconError> {
        self.overrides
            .write(Level::Warning, &override_message(original, replacement))
    }
}
