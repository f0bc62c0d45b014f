use serde::Serialize;

use crate::config::DuplicatePolicy;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One (label, count) row from the input extract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecord {
    pub label: String,
    pub count: f64,
    /// 1-based line in the source file (0 when built in memory).
    pub line: usize,
}

impl RawRecord {
    pub fn new(label: impl Into<String>, count: f64) -> Self {
        Self { label: label.into(), count, line: 0 }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A taxonomy label seen more than once; the last count won.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateLabel {
    pub label: String,
    pub occurrences: usize,
    pub kept_count: f64,
}

/// Complete, taxonomy-ordered result of one reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// One count per taxonomy label, in taxonomy order.
    pub vector: Vec<f64>,
    /// Records whose label is not in the taxonomy, in input order.
    pub unmatched: Vec<RawRecord>,
    /// Taxonomy labels absent from the input (filled with 0).
    pub missing_count: usize,
    /// Taxonomy labels present in the input.
    pub matched_count: usize,
    /// Per taxonomy label: did the input carry it.
    pub present: Vec<bool>,
    pub duplicates: Vec<DuplicateLabel>,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub taxonomy_size: usize,
    pub input_records: usize,
    pub matched: usize,
    pub missing: usize,
    pub unmatched: usize,
    pub duplicates: usize,
    pub total_count: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub taxonomy: String,
    pub duplicate_policy: DuplicatePolicy,
    pub engine_version: String,
    pub run_at: String,
}

/// Reconciliation plus the context needed to report on it.
#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// (label, count) pairs in taxonomy order.
    pub rows: Vec<ReportRow>,
    pub unmatched: Vec<RawRecord>,
    pub duplicates: Vec<DuplicateLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub count: f64,
    pub present: bool,
}
