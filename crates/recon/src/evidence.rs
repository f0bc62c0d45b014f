use crate::model::{RawRecord, ReconSummary, Reconciliation};

/// How many unmatched labels to list before collapsing the rest.
pub const UNMATCHED_PREVIEW: usize = 5;

/// Compute summary statistics for a reconciliation.
pub fn compute_summary(input_records: usize, recon: &Reconciliation) -> ReconSummary {
    ReconSummary {
        taxonomy_size: recon.vector.len(),
        input_records,
        matched: recon.matched_count,
        missing: recon.missing_count,
        unmatched: recon.unmatched.len(),
        duplicates: recon.duplicates.len(),
        total_count: recon.vector.iter().sum(),
    }
}

/// Human-readable lines for records that matched no taxonomy label:
/// the first few labels, then a count of the rest.
pub fn summarize_unmatched(unmatched: &[RawRecord]) -> Vec<String> {
    if unmatched.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!(
        "{} row(s) didn't match any expected label:",
        unmatched.len()
    )];
    for record in unmatched.iter().take(UNMATCHED_PREVIEW) {
        lines.push(format!("  - {}", record.label));
    }
    if unmatched.len() > UNMATCHED_PREVIEW {
        lines.push(format!("  ... and {} more", unmatched.len() - UNMATCHED_PREVIEW));
    }
    lines
}
