//! Categorisation of engine curves.
//!
//! Each curve column is looked up in a `MappingTable`, signed according to
//! the flow convention and the entry's own multiplier, and summed into the
//! column of its label. Output columns are ordered lexicographically.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::domain::{CurveSet, DEFAULT_LABEL_COLUMN, FlowSign, MappingTable, UnmappedPolicy};
use crate::error::TransformError;

/// Options for `categorise`.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoriseOptions {
    /// Mapping column holding the target label.
    pub column: String,
    pub unmapped: UnmappedPolicy,
    pub flow_sign: FlowSign,
}

impl Default for CategoriseOptions {
    fn default() -> Self {
        Self {
            column: DEFAULT_LABEL_COLUMN.to_string(),
            unmapped: UnmappedPolicy::Strict,
            flow_sign: FlowSign::DemandNegative,
        }
    }
}

/// Aggregate curve columns into one column per distinct label.
///
/// The flow sign is applied before aggregation, so an identity mapping only
/// reproduces the input with `FlowSign::None`. Under the default
/// `DemandNegative`, identity-mapped `.input (MW)` columns come back negated.
pub fn categorise(
    curves: &CurveSet,
    mapping: &MappingTable,
    options: &CategoriseOptions,
) -> Result<CurveSet, TransformError> {
    aggregate(curves, mapping, options, |label, _| label.to_string())
}

/// Like `categorise`, but keeps the original key next to the label
/// (`"<label>|<key>"`), so no two keys are merged.
pub fn categorise_keys(
    curves: &CurveSet,
    mapping: &MappingTable,
    options: &CategoriseOptions,
) -> Result<CurveSet, TransformError> {
    aggregate(curves, mapping, options, |label, key| format!("{label}|{key}"))
}

fn aggregate<F>(
    curves: &CurveSet,
    mapping: &MappingTable,
    options: &CategoriseOptions,
    target: F,
) -> Result<CurveSet, TransformError>
where
    F: Fn(&str, &str) -> String,
{
    let unmapped: Vec<String> = curves
        .columns()
        .iter()
        .filter(|c| mapping.get(c).is_none())
        .cloned()
        .collect();

    if !unmapped.is_empty() {
        match options.unmapped {
            UnmappedPolicy::Strict => return Err(TransformError::UnmappedKeys(unmapped)),
            UnmappedPolicy::Drop => debug!(keys = ?unmapped, "dropping unmapped curve columns"),
        }
    }

    let unused: Vec<&String> = mapping
        .keys()
        .iter()
        .filter(|k| curves.position(k).is_none())
        .collect();
    if !unused.is_empty() {
        warn!(keys = ?unused, "unused key(s) in mapping");
    }

    let rows = curves.n_rows();
    let mut sums: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (key, series) in curves.iter() {
        let Some(entry) = mapping.get(key) else {
            continue;
        };
        let label = entry
            .labels
            .get(&options.column)
            .ok_or_else(|| TransformError::UnknownLabelColumn(options.column.clone()))?;

        let factor = options.flow_sign.factor(key) * entry.sign;
        let acc = sums
            .entry(target(label.as_str(), key))
            .or_insert_with(|| vec![0.0; rows]);
        for (a, v) in acc.iter_mut().zip(series) {
            *a += factor * v;
        }
    }

    CurveSet::new(curves.index().to_vec(), sums.into_iter().collect())
}
