//! Allocation of categorised curves over geographic nodes.
//!
//! A `FractionTable` attributes a share of every category column to each
//! node. Three views are offered, none of which materialises the full
//! node x time x category cube:
//!
//! - `regionalise_node`: one node's share, per category
//! - `regionalise`: the residual, i.e. all nodes except one, per category
//! - `node_loads`: per-node total (dot product over categories)
//!
//! With fractions summing to 1 per column, `regionalise(.., n)` plus
//! `regionalise_node(.., n)` reproduces the input curves.

use crate::domain::{CurveSet, ErrorHandling, FractionTable, NodeRef};
use crate::error::TransformError;
use crate::transform::validate::{
    BALANCE_PRECISION, FRACTION_PRECISION, check_hourly_balance, validate_fractions,
};

/// Curves scaled by the combined share of every node except `excluded`.
pub fn regionalise(
    curves: &CurveSet,
    fractions: &FractionTable,
    excluded: &NodeRef,
) -> Result<CurveSet, TransformError> {
    validate_fractions(curves, fractions, FRACTION_PRECISION, ErrorHandling::Warn)?;
    let excluded = fractions.node_position(excluded)?;

    let included: Vec<usize> = (0..fractions.nodes().len()).filter(|&n| n != excluded).collect();
    scale_columns(curves, fractions, &included)
}

/// Curves scaled by the share of a single node.
///
/// Unbalanced input curves are reported as a warning.
pub fn regionalise_node(
    curves: &CurveSet,
    fractions: &FractionTable,
    node: &NodeRef,
) -> Result<CurveSet, TransformError> {
    check_hourly_balance(curves, BALANCE_PRECISION, ErrorHandling::Warn)?;
    validate_fractions(curves, fractions, FRACTION_PRECISION, ErrorHandling::Warn)?;
    let node = fractions.node_position(node)?;

    scale_columns(curves, fractions, &[node])
}

/// Residual load per node: `load[t, n] = sum_c curves[t, c] * fractions[n, c]`.
///
/// `nodes` selects and orders the output columns; `None` means every node in
/// table order. The input must be hourly balanced.
pub fn node_loads(
    curves: &CurveSet,
    fractions: &FractionTable,
    nodes: Option<&[NodeRef]>,
) -> Result<CurveSet, TransformError> {
    check_hourly_balance(curves, BALANCE_PRECISION, ErrorHandling::Raise)?;
    validate_fractions(curves, fractions, FRACTION_PRECISION, ErrorHandling::Warn)?;

    let positions: Vec<usize> = match nodes {
        Some(nodes) => nodes
            .iter()
            .map(|n| fractions.node_position(n))
            .collect::<Result<_, _>>()?,
        None => (0..fractions.nodes().len()).collect(),
    };

    let weights = column_weights(curves, fractions)?;
    let mut columns = Vec::with_capacity(positions.len());
    for &node in &positions {
        let mut load = vec![0.0; curves.n_rows()];
        for ((_, series), &c) in curves.iter().zip(&weights) {
            let share = fractions.value(node, c);
            for (acc, v) in load.iter_mut().zip(series) {
                *acc += v * share;
            }
        }
        columns.push((fractions.nodes()[node].clone(), load));
    }

    CurveSet::new(curves.index().to_vec(), columns)
}

/// Scale every curve column by the summed fractions of `nodes`.
fn scale_columns(
    curves: &CurveSet,
    fractions: &FractionTable,
    nodes: &[usize],
) -> Result<CurveSet, TransformError> {
    let weights = column_weights(curves, fractions)?;
    let columns = curves
        .iter()
        .zip(&weights)
        .map(|((name, series), &c)| {
            let share: f64 = nodes.iter().map(|&n| fractions.value(n, c)).sum();
            (name.to_string(), series.iter().map(|v| v * share).collect())
        })
        .collect();

    CurveSet::new(curves.index().to_vec(), columns)
}

/// Fraction table column position for every curve column.
fn column_weights(curves: &CurveSet, fractions: &FractionTable) -> Result<Vec<usize>, TransformError> {
    let mut positions = Vec::with_capacity(curves.n_columns());
    let mut missing = Vec::new();
    for name in curves.columns() {
        match fractions.column_position(name) {
            Some(p) => positions.push(p),
            None => missing.push(name.clone()),
        }
    }
    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(TransformError::MissingKeys(missing))
    }
}
