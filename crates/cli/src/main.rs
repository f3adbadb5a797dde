// ingsync CLI - reconcile product ingredients from a lookup spreadsheet

mod exit_codes;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ingsync_recon::{DataSourceError, ReconError};

use exit_codes::{exit_code_for, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "ingsync")]
#[command(about = "Enrich a product XML catalog with ingredients from a lookup table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the product document against the lookup table
    #[command(after_help = "\
Examples:
  ingsync run
  ingsync run config.json --input xml/input.xml
  ingsync run sync.toml --dry-run --json")]
    Run {
        /// JSON or TOML config file
        #[arg(default_value = "config.json")]
        config: PathBuf,

        /// Product document to read (overrides `xml_input`)
        #[arg(long, short = 'i', env = "INGSYNC_INPUT")]
        input: Option<PathBuf>,

        /// Where to write the reconciled document (overrides `xml_output`)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Directory for not_founds.log and overrides.log (overrides `log_dir`)
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,

        /// Reconcile and report without writing output or log files
        #[arg(long)]
        dry_run: bool,
    },

    /// Check the config and load the lookup table without touching any document
    #[command(after_help = "\
Examples:
  ingsync validate
  ingsync validate sync.toml")]
    Validate {
        /// JSON or TOML config file
        #[arg(default_value = "config.json")]
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  ingsync-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run { config, input, output, log_dir, json, dry_run } => {
            let overrides = sync::PathOverrides { input, output, log_dir };
            sync::cmd_run(&config, overrides, json, dry_run)
        }
        Commands::Validate { config } => sync::cmd_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DataSource(DataSourceError::SheetNotFound { .. }) => {
                Some("set `sheet_name` in the config".to_string())
            }
            ReconError::DataSource(DataSourceError::MissingColumn { .. }) => {
                Some("`excel_fields` must name header cells of the first row".to_string())
            }
            ReconError::DataSource(DataSourceError::AmbiguousCode { .. }) => {
                Some("use `duplicate_codes = \"warn\"` to keep the first value".to_string())
            }
            ReconError::MalformedRecord { .. } => {
                Some("no output or counters were produced for this run".to_string())
            }
            _ => None,
        };
        Self { code: exit_code_for(&err), message: err.to_string(), hint }
    }
}
