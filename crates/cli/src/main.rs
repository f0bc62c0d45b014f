// tallysheet CLI - reconcile label/count extracts into a workbook column

mod apply;
mod exit_codes;
mod sheet_ops;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tallysheet_config::{Session, Settings};
use tallysheet_engine::CellRefError;
use tallysheet_io::IoError;
use tallysheet_recon::ReconError;

use exit_codes::{
    cell_ref_exit_code, io_exit_code, recon_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE,
};

/// Environment variable holding the log filter (e.g. `debug`, `tallysheet_io=trace`).
const LOG_ENV: &str = "TSHEET_LOG";

#[derive(Parser)]
#[command(name = "tsheet")]
#[command(about = "Reconcile transaction-evaluation counts into a spreadsheet column")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the workbook (and sheet) later commands work on
    #[command(after_help = "\
Examples:
  tsheet use ~/reports/2026-q3.xlsx
  tsheet use ~/reports/2026-q3.xlsx --sheet Counts")]
    Use {
        /// Workbook file (.xlsx or .xlsm)
        workbook: PathBuf,

        /// Sheet to write into (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// List the sheets of a workbook
    Sheets {
        /// Workbook file (default: session workbook)
        #[arg(long, short = 'w')]
        workbook: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Show the first rows of a sheet
    #[command(after_help = "\
Examples:
  tsheet preview
  tsheet preview --sheet Counts --rows 25
  tsheet preview --json")]
    Preview {
        #[arg(long, short = 'w')]
        workbook: Option<PathBuf>,

        #[arg(long, short = 's')]
        sheet: Option<String>,

        /// Number of rows to show
        #[arg(long, short = 'n')]
        rows: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Reconcile a label/count CSV against the taxonomy and write the counts
    #[command(after_help = "\
Examples:
  tsheet apply evaluations.csv
  tsheet apply evaluations.csv --col B --row 2
  tsheet apply evaluations.csv --sheet March --col AB
  tsheet apply evaluations.csv --taxonomy custom.toml --strict-duplicates
  tsheet apply evaluations.csv --dry-run --json")]
    Apply {
        /// CSV with label in the first column and count in the second
        csv: PathBuf,

        #[arg(long, short = 'w')]
        workbook: Option<PathBuf>,

        #[arg(long, short = 's')]
        sheet: Option<String>,

        /// 1-based row for the first taxonomy label
        #[arg(long)]
        row: Option<String>,

        /// Column as letters (B, AB) or a 1-based number
        #[arg(long)]
        col: Option<String>,

        /// TOML file replacing the built-in taxonomy
        #[arg(long, env = "TALLYSHEET_TAXONOMY")]
        taxonomy: Option<PathBuf>,

        /// Input has no header row
        #[arg(long)]
        no_headers: bool,

        /// CSV delimiter (default: sniffed)
        #[arg(long)]
        delimiter: Option<char>,

        /// Fail when a label appears more than once
        #[arg(long)]
        strict_duplicates: bool,

        /// Reconcile and report without touching the workbook
        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// Copy the workbook to another path
    Export {
        /// Destination file
        dest: PathBuf,

        #[arg(long, short = 'w')]
        workbook: Option<PathBuf>,
    },

    /// Print the active taxonomy in output order
    Taxonomy {
        #[arg(long, env = "TALLYSHEET_TAXONOMY")]
        taxonomy: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Resolve a column reference to its index and letters
    #[command(after_help = "\
Examples:
  tsheet column AB     # 28 (AB)
  tsheet column 3      # 3 (C)")]
    Column {
        reference: String,
    },

    /// Show or reset the current session
    Session {
        /// Forget the selected workbook and sheet
        #[arg(long)]
        clear: bool,

        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging() {
    use std::io::IsTerminal;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let mut ctx = Context::load();

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: tsheet <command> [options]");
            eprintln!("       tsheet --help for more information");
            Ok(())
        }
        Some(Commands::Use { workbook, sheet }) => sheet_ops::cmd_use(&mut ctx, workbook, sheet),
        Some(Commands::Sheets { workbook, json }) => sheet_ops::cmd_sheets(&ctx, workbook, json),
        Some(Commands::Preview { workbook, sheet, rows, json }) => {
            sheet_ops::cmd_preview(&ctx, workbook, sheet, rows, json)
        }
        Some(Commands::Apply {
            csv,
            workbook,
            sheet,
            row,
            col,
            taxonomy,
            no_headers,
            delimiter,
            strict_duplicates,
            dry_run,
            json,
        }) => apply::cmd_apply(
            &ctx,
            apply::ApplyArgs {
                csv,
                workbook,
                sheet,
                row,
                col,
                taxonomy,
                no_headers,
                delimiter,
                strict_duplicates,
                dry_run,
                json,
            },
        ),
        Some(Commands::Export { dest, workbook }) => sheet_ops::cmd_export(&ctx, dest, workbook),
        Some(Commands::Taxonomy { taxonomy, json }) => apply::cmd_taxonomy(&ctx, taxonomy, json),
        Some(Commands::Column { reference }) => cmd_column(&reference),
        Some(Commands::Session { clear, json }) => sheet_ops::cmd_session(&mut ctx, clear, json),
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

// ============================================================================
// Context
// ============================================================================

/// Per-invocation state: persisted session plus user settings.
pub struct Context {
    pub session: Session,
    pub settings: Settings,
}

impl Context {
    pub fn load() -> Self {
        Self { session: Session::load(), settings: Settings::load() }
    }

    /// `--workbook` flag, else the session workbook.
    pub fn workbook(&self, flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
        if let Some(path) = flag {
            return Ok(util::expand_path(&path));
        }
        self.session.workbook.clone().ok_or_else(|| {
            CliError::args("no workbook selected")
                .with_hint("run `tsheet use <WORKBOOK>` or pass --workbook")
        })
    }

    /// Sheet to operate on: flag, then the session sheet (when the session
    /// refers to this workbook), then settings, then the first sheet.
    pub fn sheet(&self, flag: Option<String>, workbook: &Path) -> Result<String, CliError> {
        if let Some(sheet) = flag {
            return Ok(sheet);
        }
        let session_applies = self
            .session
            .workbook
            .as_deref()
            .is_some_and(|selected| util::same_file(selected, workbook));
        if session_applies {
            if let Some(sheet) = &self.session.sheet {
                return Ok(sheet.clone());
            }
        }
        if let Some(sheet) = &self.settings.default_sheet {
            return Ok(sheet.clone());
        }
        let names = tallysheet_io::list_sheet_names(workbook)?;
        Ok(names.into_iter().next().unwrap_or_else(|| "Sheet1".to_string()))
    }

    pub fn save_session(&self) -> Result<(), CliError> {
        self.session.save().map_err(|e| {
            CliError::general(format!("cannot save session: {}", e))
                .with_hint(format!("check permissions on {}", tallysheet_config::config_dir().display()))
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::WorkbookNotFound(_) => Some("check the path, or select another with `tsheet use`".to_string()),
            IoError::WorkbookUnreadable { .. } => Some("only .xlsx and .xlsm workbooks can be written; other formats can be previewed".to_string()),
            IoError::SheetNotFound { .. } => Some("`tsheet sheets` lists the available sheets".to_string()),
            IoError::PersistenceError { .. } => Some("the original file was left unchanged".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DuplicateLabel { .. } => {
                Some("drop --strict-duplicates to keep the last occurrence".to_string())
            }
            ReconError::InvalidCountValue { .. } => {
                Some("counts must be numbers; check --delimiter and --no-headers".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<CellRefError> for CliError {
    fn from(err: CellRefError) -> Self {
        let hint = match &err {
            CellRefError::InvalidColumnReference(_) => "use letters (B, AB) or a positive number (2, 28)",
            CellRefError::InvalidRowReference(_) => "rows are positive numbers starting at 1",
        };
        Self { code: cell_ref_exit_code(&err), message: err.to_string(), hint: Some(hint.to_string()) }
    }
}

// ============================================================================
// column
// ============================================================================

fn cmd_column(reference: &str) -> Result<(), CliError> {
    let col = tallysheet_engine::resolve_column(reference)?;
    println!("{} ({})", col, tallysheet_engine::column_to_letters(col));
    Ok(())
}
