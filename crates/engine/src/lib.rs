//! `tallysheet-engine`: cell values, sheet-name rules and cell addressing.
//!
//! Shared vocabulary for the io and CLI crates. Nothing here touches files
//! or evaluates formulas.

pub mod cell;
pub mod cell_ref;
pub mod sheet;

pub use cell::CellValue;
pub use cell_ref::{column_to_letters, parse_start_row, resolve_column, row_col_to_a1, CellRefError};
pub use sheet::{is_valid_sheet_name, normalize_sheet_name, MAX_COLS, MAX_ROWS};
