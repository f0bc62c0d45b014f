// Read-only access for inspecting a workbook before projecting into it

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use serde::Serialize;
use tallysheet_engine::cell::CellValue;

use crate::error::IoError;
use crate::project::ensure_workbook;

pub const DEFAULT_PREVIEW_ROWS: usize = 10;

fn open(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, IoError> {
    ensure_workbook(path)?;
    open_workbook_auto(path).map_err(|e| IoError::WorkbookUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Sheet names in workbook order.
pub fn list_sheet_names(path: &Path) -> Result<Vec<String>, IoError> {
    Ok(open(path)?.sheet_names().to_vec())
}

/// First `max_rows` rows of the sheet counted from row 1, values only
/// (formulas show their cached result). Row and column indices line up with
/// the sheet: `rows[r][c]` is the cell at 1-based (r + 1, c + 1).
pub fn read_rows(path: &Path, sheet: &str, max_rows: usize) -> Result<Vec<Vec<CellValue>>, IoError> {
    let mut workbook = open(path)?;

    let names = workbook.sheet_names().to_vec();
    if !names.iter().any(|n| n == sheet) {
        return Err(IoError::SheetNotFound {
            sheet: sheet.to_string(),
            available: names,
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| IoError::WorkbookUnreadable {
            path: path.to_path_buf(),
            reason: format!("sheet '{}': {}", sheet, e),
        })?;

    // calamine ranges begin at the first used cell, not at A1
    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };
    let (start_row, start_col) = (start_row as usize, start_col as usize);
    let width = start_col + range.width();

    let leading = (0..start_row).map(|_| vec![CellValue::Empty; width]);
    let data = range.rows().map(|row| {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(data_to_cell_value));
        cells
    });
    Ok(leading.chain(data).take(max_rows).collect())
}

fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

/// Rectangular view of preview rows with generic column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewGrid {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl PreviewGrid {
    /// Pad ragged rows with empty cells; columns are named `Col 1..n`.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let columns = (1..=width).map(|i| format!("Col {}", i)).collect();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
