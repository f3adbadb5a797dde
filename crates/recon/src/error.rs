use std::fmt;
use std::path::PathBuf;

/// Failure to turn the tabular source into a lookup table.
#[derive(Debug)]
pub enum DataSourceError {
    /// Source path does not exist.
    Missing { path: PathBuf },
    /// Source exists but could not be opened or decoded.
    Unreadable { path: PathBuf, message: String },
    /// Named sheet is not present in the workbook.
    SheetNotFound { sheet: String, available: Vec<String> },
    /// Named column is not present in the header row.
    MissingColumn { column: String },
    /// Same code maps to differing ingredients and the duplicate policy rejects it.
    AmbiguousCode { code: String, candidates: usize },
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "source not found: {}", path.display()),
            Self::Unreadable { path, message } => {
                write!(f, "cannot read {}: {message}", path.display())
            }
            Self::SheetNotFound { sheet, available } => {
                write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
            }
            Self::MissingColumn { column } => write!(f, "missing column '{column}'"),
            Self::AmbiguousCode { code, candidates } => {
                write!(f, "code '{code}' has {candidates} differing ingredient values")
            }
        }
    }
}

#[derive(Debug)]
pub enum ReconError {
    /// JSON/TOML parse or deserialization error.
    ConfigParse(String),
    /// Config validation error (bad field pair, unknown prefix, etc.).
    ConfigValidation(String),
    /// Lookup table could not be built.
    DataSource(DataSourceError),
    /// XML document is not well-formed.
    Xml(String),
    /// Products container not found under the document root.
    MissingContainer { name: String },
    /// A record has no code field. `index` is 1-based, in document order.
    MalformedRecord { index: usize, field: String },
    /// IO error (file read/write, log stream, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::DataSource(err) => write!(f, "data source error: {err}"),
            Self::Xml(msg) => write!(f, "XML error: {msg}"),
            Self::MissingContainer { name } => {
                write!(f, "products container {name} not found under document root")
            }
            Self::MalformedRecord { index, field } => {
                write!(f, "record #{index}: missing code field {field}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<DataSourceError> for ReconError {
    fn from(err: DataSourceError) -> Self {
        Self::DataSource(err)
    }
}

impl From<std::io::Error> for ReconError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
