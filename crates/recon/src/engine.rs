use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::evidence::{compute_summary, summarize_unmatched};
use crate::model::{RawRecord, ReconMeta, ReconReport, Reconciliation, ReportRow};
use crate::reconcile::reconcile;
use crate::taxonomy::Taxonomy;

/// Reconcile and wrap the result with metadata and a summary.
///
/// Returns the bare reconciliation (for projection) alongside the report
/// (for display / JSON output).
pub fn run(
    table: &[RawRecord],
    taxonomy: &Taxonomy,
    policy: DuplicatePolicy,
) -> Result<(Reconciliation, ReconReport), ReconError> {
    let recon = reconcile(table, taxonomy, policy)?;

    log::info!(
        "added {} missing label(s) with count 0, {} matched",
        recon.missing_count,
        recon.matched_count
    );
    for line in summarize_unmatched(&recon.unmatched) {
        log::warn!("{line}");
    }

    let report = build_report(table.len(), taxonomy, policy, &recon);
    Ok((recon, report))
}

fn build_report(
    input_records: usize,
    taxonomy: &Taxonomy,
    policy: DuplicatePolicy,
    recon: &Reconciliation,
) -> ReconReport {
    let rows = taxonomy
        .labels()
        .iter()
        .zip(recon.vector.iter().zip(recon.present.iter()))
        .map(|(label, (count, present))| ReportRow {
            label: label.clone(),
            count: *count,
            present: *present,
        })
        .collect();

    ReconReport {
        meta: ReconMeta {
            taxonomy: taxonomy.name().to_string(),
            duplicate_policy: policy,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: compute_summary(input_records, recon),
        rows,
        unmatched: recon.unmatched.clone(),
        duplicates: recon.duplicates.clone(),
    }
}
