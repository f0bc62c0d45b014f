use std::collections::HashMap;

use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::model::{DuplicateLabel, RawRecord, Reconciliation};
use crate::taxonomy::Taxonomy;

struct Seen {
    count: f64,
    occurrences: usize,
    first_line: usize,
}

/// Map raw records onto the taxonomy.
///
/// The output vector has one entry per taxonomy label in taxonomy order,
/// regardless of input order. Labels missing from the input get 0. Records
/// with unknown labels are returned separately and never contribute to the
/// vector. Either the whole result is returned or nothing is.
pub fn reconcile(
    table: &[RawRecord],
    taxonomy: &Taxonomy,
    policy: DuplicatePolicy,
) -> Result<Reconciliation, ReconError> {
    let mut seen: HashMap<&str, Seen> = HashMap::new();
    let mut unmatched = Vec::new();

    for record in table {
        if !taxonomy.contains(&record.label) {
            unmatched.push(record.clone());
            continue;
        }

        match seen.get_mut(record.label.as_str()) {
            Some(entry) => {
                if policy == DuplicatePolicy::Reject {
                    return Err(ReconError::DuplicateLabel {
                        label: record.label.clone(),
                        first_line: entry.first_line,
                        line: record.line,
                    });
                }
                entry.count = record.count;
                entry.occurrences += 1;
            }
            None => {
                seen.insert(
                    record.label.as_str(),
                    Seen { count: record.count, occurrences: 1, first_line: record.line },
                );
            }
        }
    }

    let mut vector = Vec::with_capacity(taxonomy.len());
    let mut present = Vec::with_capacity(taxonomy.len());
    let mut duplicates = Vec::new();
    let mut missing_count = 0;

    for label in taxonomy.labels() {
        match seen.get(label.as_str()) {
            Some(entry) => {
                vector.push(entry.count);
                present.push(true);
                if entry.occurrences > 1 {
                    duplicates.push(DuplicateLabel {
                        label: label.clone(),
                        occurrences: entry.occurrences,
                        kept_count: entry.count,
                    });
                }
            }
            None => {
                vector.push(0.0);
                present.push(false);
                missing_count += 1;
            }
        }
    }

    if !duplicates.is_empty() {
        log::warn!(
            "{} label(s) appeared more than once; the last occurrence was kept",
            duplicates.len()
        );
    }

    Ok(Reconciliation {
        vector,
        unmatched,
        missing_count,
        matched_count: seen.len(),
        present,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn xyz() -> Taxonomy {
        Taxonomy::new("t", vec!["{X}".into(), "{Y}".into(), "{Z}".into()]).unwrap()
    }

    fn rec(label: &str, count: f64, line: usize) -> RawRecord {
        RawRecord { label: label.into(), count, line }
    }

    #[test]
    fn fills_gaps_in_taxonomy_order() {
        let table = vec![rec("{Z}", 5.0, 2), rec("{X}", 2.0, 3)];
        let r = reconcile(&table, &xyz(), DuplicatePolicy::LastWins).unwrap();
        assert_eq!(r.vector, vec![2.0, 0.0, 5.0]);
        assert_eq!(r.missing_count, 1);
        assert_eq!(r.matched_count, 2);
        assert_eq!(r.present, vec![true, false, true]);
        assert!(r.unmatched.is_empty());
    }

    #[test]
    fn empty_table_is_all_zeros() {
        let r = reconcile(&[], &xyz(), DuplicatePolicy::LastWins).unwrap();
        assert_eq!(r.vector, vec![0.0; 3]);
        assert_eq!(r.missing_count, 3);
        assert_eq!(r.matched_count, 0);
    }

    #[test]
    fn unknown_labels_are_set_aside() {
        let table = vec![rec("{UNKNOWN}", 9.0, 2), rec("{Y}", 1.0, 3), rec("{OTHER}", 4.0, 4)];
        let r = reconcile(&table, &xyz(), DuplicatePolicy::LastWins).unwrap();
        assert_eq!(r.vector, vec![0.0, 1.0, 0.0]);
        assert_eq!(r.missing_count, 2);
        let labels: Vec<&str> = r.unmatched.iter().map(|u| u.label.as_str()).collect();
        assert_eq!(labels, vec!["{UNKNOWN}", "{OTHER}"]);
        assert_eq!(r.unmatched[0].count, 9.0);
    }

    #[test]
    fn duplicates_last_wins() {
        let table = vec![rec("{X}", 1.0, 2), rec("{Y}", 7.0, 3), rec("{X}", 3.0, 4)];
        let r = reconcile(&table, &xyz(), DuplicatePolicy::LastWins).unwrap();
        assert_eq!(r.vector, vec![3.0, 7.0, 0.0]);
        assert_eq!(r.duplicates.len(), 1);
        assert_eq!(r.duplicates[0].label, "{X}");
        assert_eq!(r.duplicates[0].occurrences, 2);
        assert_eq!(r.duplicates[0].kept_count, 3.0);
    }

    #[test]
    fn duplicates_rejected_when_strict() {
        let table = vec![rec("{X}", 1.0, 2), rec("{X}", 3.0, 5)];
        let err = reconcile(&table, &xyz(), DuplicatePolicy::Reject).unwrap_err();
        match err {
            ReconError::DuplicateLabel { label, first_line, line } => {
                assert_eq!(label, "{X}");
                assert_eq!(first_line, 2);
                assert_eq!(line, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_duplicates_are_not_duplicates() {
        let table = vec![rec("{Q}", 1.0, 2), rec("{Q}", 3.0, 3)];
        let r = reconcile(&table, &xyz(), DuplicatePolicy::Reject).unwrap();
        assert!(r.duplicates.is_empty());
        assert_eq!(r.unmatched.len(), 2);
    }

    fn arb_taxonomy() -> impl Strategy<Value = Taxonomy> {
        prop::collection::btree_set("[A-Z]{1,4}", 1..20).prop_map(|labels| {
            Taxonomy::new("prop", labels.into_iter().map(|l| format!("{{{l}}}")).collect()).unwrap()
        })
    }

    proptest! {
        #[test]
        fn vector_matches_taxonomy_shape(
            taxonomy in arb_taxonomy(),
            picks in prop::collection::vec((any::<prop::sample::Index>(), 0u32..1000), 0..30),
            extra in prop::collection::vec("[a-z]{1,5}", 0..5),
        ) {
            let labels = taxonomy.labels();
            let mut table: Vec<RawRecord> = picks
                .iter()
                .enumerate()
                .map(|(i, (idx, n))| rec(&labels[idx.index(labels.len())], *n as f64, i + 2))
                .collect();
            table.extend(extra.iter().map(|l| rec(l, 1.0, 0)));

            let r = reconcile(&table, &taxonomy, DuplicatePolicy::LastWins).unwrap();
            prop_assert_eq!(r.vector.len(), taxonomy.len());
            prop_assert_eq!(r.unmatched.len(), extra.len());
            prop_assert_eq!(r.matched_count + r.missing_count, taxonomy.len());

            for (i, label) in labels.iter().enumerate() {
                let last = table.iter().rev().find(|t| &t.label == label);
                match last {
                    Some(t) => prop_assert_eq!(r.vector[i], t.count),
                    None => prop_assert_eq!(r.vector[i], 0.0),
                }
            }

            // Input order does not change the result when labels are unique.
            let mut dedup: Vec<RawRecord> = Vec::new();
            for t in &table {
                if !dedup.iter().any(|d| d.label == t.label) {
                    dedup.push(t.clone());
                }
            }
            let forward = reconcile(&dedup, &taxonomy, DuplicatePolicy::LastWins).unwrap();
            dedup.reverse();
            let backward = reconcile(&dedup, &taxonomy, DuplicatePolicy::LastWins).unwrap();
            prop_assert_eq!(forward.vector, backward.vector);
        }
    }
}
