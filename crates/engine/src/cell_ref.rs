//! Column and row references as people type them.
//!
//! Columns accept either a 1-based integer (`"3"`) or spreadsheet letters
//! (`"C"`, `"ab"`). Letters are bijective base-26: A=1, Z=26, AA=27.

use std::fmt;

use crate::sheet::{MAX_COLS, MAX_ROWS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellRefError {
    /// Neither a positive integer nor a letter sequence within the grid.
    InvalidColumnReference(String),
    /// Not a positive integer within the grid.
    InvalidRowReference(String),
}

impl fmt::Display for CellRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidColumnReference(r) => write!(
                f,
                "invalid column reference '{r}': expected a positive number or letters A-Z"
            ),
            Self::InvalidRowReference(r) => {
                write!(f, "invalid row '{r}': expected a positive integer")
            }
        }
    }
}

impl std::error::Error for CellRefError {}

/// Resolve a column reference to its 1-based index.
pub fn resolve_column(reference: &str) -> Result<u32, CellRefError> {
    let invalid = || CellRefError::InvalidColumnReference(reference.to_string());
    let trimmed = reference.trim();

    // Integer path first: "0" and negatives are rejected rather than falling
    // through to the letter path.
    if let Ok(n) = trimmed.parse::<i64>() {
        if n < 1 || n > MAX_COLS as i64 {
            return Err(invalid());
        }
        return Ok(n as u32);
    }

    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut result: u32 = 0;
    for ch in trimmed.chars() {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(invalid());
        }
        result = result
            .checked_mul(26)
            .and_then(|r| r.checked_add(upper as u32 - 'A' as u32 + 1))
            .filter(|r| *r <= MAX_COLS)
            .ok_or_else(invalid)?;
    }
    Ok(result)
}

/// Parse a 1-based start row.
pub fn parse_start_row(text: &str) -> Result<u32, CellRefError> {
    let trimmed = text.trim();
    match trimmed.parse::<i64>() {
        Ok(n) if n >= 1 && n <= MAX_ROWS as i64 => Ok(n as u32),
        _ => Err(CellRefError::InvalidRowReference(text.to_string())),
    }
}

/// Convert a 1-based column index to letters (1 -> A, 27 -> AA).
/// Returns an empty string for 0.
pub fn column_to_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1-style address for a 1-based (row, col).
pub fn row_col_to_a1(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), row)
}
