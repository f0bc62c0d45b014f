use std::path::PathBuf;

use tallysheet_recon::evidence::summarize_unmatched;
use tallysheet_recon::{
    load_raw_table, run, DuplicatePolicy, LoadOptions, ReconError, ReconReport, Reconciliation,
    Taxonomy, TaxonomyConfig,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn xyz() -> Taxonomy {
    TaxonomyConfig::load(&fixtures_dir().join("xyz.taxonomy.toml"))
        .unwrap()
        .taxonomy()
        .unwrap()
}

fn load_and_run(
    csv_name: &str,
    taxonomy: &Taxonomy,
    policy: DuplicatePolicy,
) -> Result<(Reconciliation, ReconReport), ReconError> {
    let path = fixtures_dir().join(csv_name);
    let csv_data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let table = load_raw_table(&csv_data, &LoadOptions::default())?;
    run(&table, taxonomy, policy)
}

// -------------------------------------------------------------------------
// Small taxonomy
// -------------------------------------------------------------------------

#[test]
fn reorders_and_fills_gaps() {
    let (recon, report) = load_and_run("scenario-a.csv", &xyz(), DuplicatePolicy::LastWins).unwrap();
    assert_eq!(recon.vector, vec![2.0, 0.0, 5.0]);
    assert_eq!(recon.missing_count, 1);
    assert_eq!(report.meta.taxonomy, "xyz");
}

#[test]
fn unknown_label_is_diagnostic_only() {
    let (recon, report) = load_and_run("with-unknown.csv", &xyz(), DuplicatePolicy::LastWins).unwrap();
    assert_eq!(recon.vector, vec![0.0, 4.0, 0.0]);
    assert_eq!(recon.missing_count, 2);
    assert_eq!(recon.unmatched.len(), 1);
    assert_eq!(recon.unmatched[0].label, "{UNKNOWN}");
    assert_eq!(recon.unmatched[0].count, 9.0);
    assert!(!report.rows.iter().any(|r| r.label == "{UNKNOWN}"));
}

#[test]
fn duplicates_follow_policy() {
    let (recon, _) = load_and_run("duplicates.csv", &xyz(), DuplicatePolicy::LastWins).unwrap();
    assert_eq!(recon.vector, vec![8.0, 0.0, 6.0]);
    assert_eq!(recon.duplicates.len(), 1);

    let err = load_and_run("duplicates.csv", &xyz(), DuplicatePolicy::Reject).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");
    assert!(err.to_string().contains("line 4"), "{err}");
}

#[test]
fn bad_count_fails_whole_run() {
    let err = load_and_run("bad-count.csv", &xyz(), DuplicatePolicy::LastWins).unwrap_err();
    match err {
        ReconError::InvalidCountValue { label, value, .. } => {
            assert_eq!(label, "{Y}");
            assert_eq!(value, "n/a");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// -------------------------------------------------------------------------
// Built-in catalog
// -------------------------------------------------------------------------

#[test]
fn builtin_catalog_extract() {
    let taxonomy = Taxonomy::builtin();
    let (recon, report) = load_and_run("evaluations.csv", &taxonomy, DuplicatePolicy::LastWins).unwrap();

    assert_eq!(recon.vector.len(), taxonomy.len());
    assert_eq!(recon.matched_count, 8);
    assert_eq!(recon.missing_count, taxonomy.len() - 8);
    assert_eq!(recon.unmatched.len(), 6);

    let at = |label: &str| recon.vector[taxonomy.order_index(label).unwrap()];
    assert_eq!(at("{DEBIT_SHOPPING}"), 31.0);
    assert_eq!(at("{INCOME_NET}"), 2.0);
    assert_eq!(at("{INFO_OTHER}"), 5.0);
    assert_eq!(at("{INCOME_PENSION}"), 0.0);

    // Non-zero rows come out in catalog order, not input order.
    let present: Vec<&str> = report
        .rows
        .iter()
        .filter(|r| r.present)
        .map(|r| r.label.as_str())
        .collect();
    assert_eq!(
        present,
        vec![
            "{INCOME_NET}",
            "{EXPENSE_RENT}",
            "{CREDIT_REFUND}",
            "{DEBIT_ATM}",
            "{DEBIT_FEE}",
            "{DEBIT_RESTAURANT}",
            "{DEBIT_SHOPPING}",
            "{INFO_OTHER}",
        ]
    );

    let lines = summarize_unmatched(&recon.unmatched);
    assert_eq!(lines[0], "6 row(s) didn't match any expected label:");
    assert_eq!(lines[1], "  - {LEGACY_BUCKET}");
    assert_eq!(lines.last().unwrap(), "  ... and 1 more");
}
