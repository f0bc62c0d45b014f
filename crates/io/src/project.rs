//! Write a reconciled vector into a workbook column and save atomically.
//!
//! Only the target worksheet part is rewritten; every other part of the
//! package is copied byte for byte. The result goes to a temporary file next
//! to the original and is renamed over it, so any failure before the rename
//! leaves the original file untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tallysheet_engine::cell_ref::row_col_to_a1;
use tallysheet_engine::sheet::{is_valid_sheet_name, normalize_sheet_name, MAX_COLS, MAX_ROWS};

use crate::error::IoError;
use crate::xlsx::XlsxPackage;

/// Extensions of zip-packaged workbooks the projector can rewrite.
const WRITABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// Top cell of the write span, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Anchor {
    pub row: u32,
    pub col: u32,
}

impl Anchor {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn a1(&self) -> String {
        row_col_to_a1(self.row, self.col)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResult {
    pub workbook: PathBuf,
    pub sheet: String,
    /// The sheet did not exist and was appended.
    pub sheet_created: bool,
    /// A1 range covered by the write, e.g. `B2:B118`. `None` for an empty vector.
    pub range: Option<String>,
    pub cells_written: usize,
    pub bytes_written: u64,
}

/// Write `values` down one column starting at `anchor` and save the workbook
/// in place.
///
/// Cells outside the span, other sheets, styles, defined names and merged
/// ranges are carried over unchanged.
pub fn project(
    workbook_path: &Path,
    sheet_name: &str,
    anchor: Anchor,
    values: &[f64],
) -> Result<ProjectResult, IoError> {
    ensure_workbook(workbook_path)?;
    ensure_writable(workbook_path)?;
    check_sheet_name(sheet_name)?;
    check_span(anchor, values.len())?;

    let unreadable = |reason: String| IoError::WorkbookUnreadable {
        path: workbook_path.to_path_buf(),
        reason,
    };

    let source = fs::read(workbook_path).map_err(|e| unreadable(e.to_string()))?;
    let mut package = XlsxPackage::open(source).map_err(unreadable)?;

    let names = package.sheet_names();
    let sheet_created = if names.iter().any(|n| n == sheet_name) {
        false
    } else if names.iter().any(|n| normalize_sheet_name(n) == normalize_sheet_name(sheet_name)) {
        return Err(IoError::InvalidSheetName {
            sheet: sheet_name.to_string(),
            reason: "another sheet already uses this name with different case".into(),
        });
    } else {
        package.add_sheet(sheet_name).map_err(unreadable)?;
        log::info!("sheet '{}' not found; created it", sheet_name);
        true
    };

    let written = package
        .write_column(sheet_name, anchor.row, anchor.col, values)
        .map_err(unreadable)?;
    if written.formulas_replaced > 0 {
        log::warn!(
            "overwrote {} formula cell(s) in '{}'",
            written.formulas_replaced,
            sheet_name
        );
    }

    let bytes = package.to_bytes().map_err(|reason| IoError::PersistenceError {
        path: workbook_path.to_path_buf(),
        reason,
    })?;
    persist_atomically(workbook_path, &bytes)?;

    let range = (!values.is_empty()).then(|| {
        let last = Anchor::new(anchor.row + values.len() as u32 - 1, anchor.col);
        format!("{}:{}", anchor.a1(), last.a1())
    });

    log::info!(
        "wrote {} value(s) to '{}'!{} in {}",
        written.cells_written,
        sheet_name,
        range.as_deref().unwrap_or("-"),
        workbook_path.display()
    );

    Ok(ProjectResult {
        workbook: workbook_path.to_path_buf(),
        sheet: sheet_name.to_string(),
        sheet_created,
        range,
        cells_written: written.cells_written,
        bytes_written: bytes.len() as u64,
    })
}

pub(crate) fn ensure_workbook(path: &Path) -> Result<(), IoError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(IoError::WorkbookNotFound(path.to_path_buf()))
    }
}

/// Legacy `.xls`, binary `.xlsb` and `.ods` can be previewed but not saved.
fn ensure_writable(path: &Path) -> Result<(), IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if WRITABLE_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(());
    }
    Err(IoError::WorkbookUnreadable {
        path: path.to_path_buf(),
        reason: "only .xlsx and .xlsm workbooks can be written".into(),
    })
}

fn check_sheet_name(name: &str) -> Result<(), IoError> {
    if is_valid_sheet_name(name) {
        return Ok(());
    }
    Err(IoError::InvalidSheetName {
        sheet: name.to_string(),
        reason: "names must be 1-31 characters without []:*?/\\ or surrounding quotes".into(),
    })
}

fn check_span(anchor: Anchor, len: usize) -> Result<(), IoError> {
    let out_of_range = || IoError::AnchorOutOfRange {
        row: anchor.row,
        col: anchor.col,
        len,
    };
    if anchor.row == 0 || anchor.col == 0 || anchor.col > MAX_COLS {
        return Err(out_of_range());
    }
    let last_row = u64::from(anchor.row) + len.saturating_sub(1) as u64;
    if last_row > u64::from(MAX_ROWS) {
        return Err(out_of_range());
    }
    Ok(())
}

/// Write `bytes` to a sibling temp file and rename it over `path`.
fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    let failed = |reason: String| IoError::PersistenceError {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".tallysheet-")
        .suffix(".xlsx.tmp")
        .tempfile_in(dir)
        .map_err(|e| failed(format!("cannot create temporary file: {}", e)))?;

    tmp.write_all(bytes).map_err(|e| failed(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| failed(e.to_string()))?;

    if let Ok(meta) = std::fs::metadata(path) {
        if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
            log::warn!("could not copy permissions to {}: {}", path.display(), e);
        }
    }

    tmp.persist(path).map_err(|e| failed(e.error.to_string()))?;
    Ok(())
}
