//! `tallysheet-io`: workbook and CSV file access.
//!
//! - [`project`] writes a reconciled vector into a sheet column and saves atomically
//! - [`xlsx`] edits worksheet parts in place, copying the rest of the package
//! - [`preview`] lists sheets and reads the first rows of one
//! - [`export`] copies the working workbook elsewhere
//! - [`csv`] reads label/count extracts from disk

pub mod csv;
pub mod error;
pub mod export;
pub mod preview;
pub mod project;
pub mod xlsx;

pub use error::IoError;
pub use export::export_copy;
pub use preview::{list_sheet_names, read_rows, PreviewGrid, DEFAULT_PREVIEW_ROWS};
pub use project::{project, Anchor, ProjectResult};
pub use xlsx::{ColumnWrite, XlsxPackage};
