//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad args, no workbook selected)      |
//! | 3    | Invalid column/row reference or write span        |
//! | 4    | Invalid count value in the input                  |
//! | 5    | Workbook not found or not readable                |
//! | 6    | Sheet not found or invalid sheet name             |
//! | 7    | Saving the workbook failed                        |
//! | 8    | Input file unreadable or malformed                |
//! | 9    | Duplicate label rejected                          |
//! | 10   | Invalid taxonomy config                           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the mapping functions below

use tallysheet_engine::CellRefError;
use tallysheet_io::IoError;
use tallysheet_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Column or row reference did not resolve, or the span leaves the grid.
pub const EXIT_INVALID_REFERENCE: u8 = 3;

/// A count cell is empty, non-numeric, or not finite.
pub const EXIT_INVALID_COUNT: u8 = 4;

/// Workbook path missing, or the file is not a workbook.
pub const EXIT_WORKBOOK_NOT_FOUND: u8 = 5;

/// Sheet missing on a read, or the requested name is unusable.
pub const EXIT_SHEET_NOT_FOUND: u8 = 6;

/// Writing the workbook (or an export copy) failed. Original untouched.
pub const EXIT_PERSISTENCE: u8 = 7;

/// Input CSV cannot be read or has rows with fewer than two columns.
pub const EXIT_INPUT_UNREADABLE: u8 = 8;

/// Same label appeared twice while duplicates are rejected.
pub const EXIT_DUPLICATE_LABEL: u8 = 9;

/// Taxonomy file unreadable, unparsable, or invalid.
pub const EXIT_INVALID_TAXONOMY: u8 = 10;

/// Map a reconciliation error to its exit code.
///
/// `Io` here means CSV framing; taxonomy file reads are mapped by the caller.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::InvalidCountValue { .. } => EXIT_INVALID_COUNT,
        ReconError::MissingColumn { .. } | ReconError::Io(_) => EXIT_INPUT_UNREADABLE,
        ReconError::DuplicateLabel { .. } => EXIT_DUPLICATE_LABEL,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_TAXONOMY,
    }
}

/// Map a file/workbook error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::WorkbookNotFound(_) | IoError::WorkbookUnreadable { .. } => EXIT_WORKBOOK_NOT_FOUND,
        IoError::SheetNotFound { .. } | IoError::InvalidSheetName { .. } => EXIT_SHEET_NOT_FOUND,
        IoError::AnchorOutOfRange { .. } => EXIT_INVALID_REFERENCE,
        IoError::PersistenceError { .. } => EXIT_PERSISTENCE,
        IoError::InputFileUnreadable { .. } => EXIT_INPUT_UNREADABLE,
        IoError::Recon(e) => recon_exit_code(e),
    }
}

pub fn cell_ref_exit_code(_err: &CellRefError) -> u8 {
    EXIT_INVALID_REFERENCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn codes_are_unique() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_REFERENCE,
            EXIT_INVALID_COUNT,
            EXIT_WORKBOOK_NOT_FOUND,
            EXIT_SHEET_NOT_FOUND,
            EXIT_PERSISTENCE,
            EXIT_INPUT_UNREADABLE,
            EXIT_DUPLICATE_LABEL,
            EXIT_INVALID_TAXONOMY,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn nested_recon_errors_keep_their_code() {
        let err = IoError::Recon(ReconError::DuplicateLabel {
            label: "{X}".into(),
            first_line: 2,
            line: 4,
        });
        assert_eq!(io_exit_code(&err), EXIT_DUPLICATE_LABEL);
    }

    #[test]
    fn workbook_errors() {
        assert_eq!(
            io_exit_code(&IoError::WorkbookNotFound(PathBuf::from("x.xlsx"))),
            EXIT_WORKBOOK_NOT_FOUND
        );
        assert_eq!(
            io_exit_code(&IoError::PersistenceError { path: PathBuf::from("x"), reason: String::new() }),
            EXIT_PERSISTENCE
        );
    }
}
