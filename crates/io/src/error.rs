use std::fmt;
use std::path::PathBuf;

use tallysheet_recon::ReconError;

#[derive(Debug)]
pub enum IoError {
    /// Workbook path does not point at an existing file.
    WorkbookNotFound(PathBuf),
    /// File exists but is not a readable workbook.
    WorkbookUnreadable { path: PathBuf, reason: String },
    /// Read path only: the projector creates missing sheets.
    SheetNotFound { sheet: String, available: Vec<String> },
    /// Sheet name breaks Excel's naming rules or collides with another sheet.
    InvalidSheetName { sheet: String, reason: String },
    /// The write span does not fit in the grid.
    AnchorOutOfRange { row: u32, col: u32, len: usize },
    /// Saving failed; the file on disk was left as it was.
    PersistenceError { path: PathBuf, reason: String },
    /// Input CSV could not be opened.
    InputFileUnreadable { path: PathBuf, reason: String },
    /// Input CSV opened but its rows are malformed.
    Recon(ReconError),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkbookNotFound(path) => write!(f, "workbook not found: {}", path.display()),
            Self::WorkbookUnreadable { path, reason } => {
                write!(f, "cannot read workbook {}: {reason}", path.display())
            }
            Self::SheetNotFound { sheet, available } => {
                write!(f, "sheet '{sheet}' not found (available: {})", available.join(", "))
            }
            Self::InvalidSheetName { sheet, reason } => {
                write!(f, "invalid sheet name '{sheet}': {reason}")
            }
            Self::AnchorOutOfRange { row, col, len } => write!(
                f,
                "cannot write {len} value(s) starting at row {row}, column {col}: outside the sheet grid"
            ),
            Self::PersistenceError { path, reason } => {
                write!(f, "cannot save {}: {reason}", path.display())
            }
            Self::InputFileUnreadable { path, reason } => {
                write!(f, "cannot read input file {}: {reason}", path.display())
            }
            Self::Recon(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Recon(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ReconError> for IoError {
    fn from(err: ReconError) -> Self {
        Self::Recon(err)
    }
}
