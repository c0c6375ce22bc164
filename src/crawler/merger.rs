//! Joins indicator records with category membership by country name

use crate::config::AmbiguityPolicy;
use crate::record::{CategoryIndex, CountryRecord};
use crate::AtlasError;
use std::collections::BTreeMap;

/// What the merge did, per dimension field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Records left without a label, by dimension field
    pub unmatched: BTreeMap<String, usize>,
    /// Record/dimension pairs with more than one candidate label
    pub ambiguous: usize,
}

/// Attaches category labels to every record
///
/// For each record and dimension, the category values whose member set
/// contains the record's name are collected in listing order. No match leaves
/// the field absent, one match is assigned, and several matches are resolved
/// by `policy`. With [`AmbiguityPolicy::Reject`] the first ambiguous pair
/// aborts the merge.
pub fn merge(
    records: &mut [CountryRecord],
    categories: &CategoryIndex,
    policy: AmbiguityPolicy,
) -> Result<MergeReport, AtlasError> {
    let mut report = MergeReport::default();

    for dimension in categories.dimensions() {
        let mut unmatched = 0;

        for record in records.iter_mut() {
            let labels = dimension.labels_for(&record.country_name);

            let chosen = match labels.as_slice() {
                [] => None,
                [only] => Some(*only),
                [first, .., last] => {
                    report.ambiguous += 1;
                    match policy {
                        AmbiguityPolicy::FirstListed => Some(*first),
                        AmbiguityPolicy::LastListed => Some(*last),
                        AmbiguityPolicy::Reject => {
                            return Err(AtlasError::AmbiguousCategory {
                                country: record.country_name.clone(),
                                field: dimension.field.clone(),
                                labels: labels.iter().map(|l| l.to_string()).collect(),
                            });
                        }
                    }
                }
            };

            match chosen {
                Some(label) => {
                    if labels.len() > 1 {
                        tracing::debug!(
                            "{} matches {} {} values, using '{}'",
                            record.country_name,
                            labels.len(),
                            dimension.field,
                            label
                        );
                    }
                    record.set_category(&dimension.field, label);
                }
                None => unmatched += 1,
            }
        }

        report.unmatched.insert(dimension.field.clone(), unmatched);
    }

    Ok(report)
}
