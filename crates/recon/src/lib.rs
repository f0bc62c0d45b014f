//! `tallysheet-recon`: taxonomy-driven reconciliation of (label, count) extracts.
//!
//! Pure engine crate: receives pre-loaded records, returns a complete,
//! taxonomy-ordered count vector. No workbook or CLI dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod loader;
pub mod model;
pub mod reconcile;
pub mod taxonomy;

pub use config::{DuplicatePolicy, TaxonomyConfig};
pub use engine::run;
pub use error::ReconError;
pub use loader::{load_raw_table, LoadOptions};
pub use model::{RawRecord, ReconReport, Reconciliation};
pub use reconcile::reconcile;
pub use taxonomy::Taxonomy;
