//! Reporting utilities: curve statistics and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::CurveSet;

/// Per-column statistics of a curve set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize every column of a curve set, in column order.
pub fn summarize(curves: &CurveSet) -> Vec<ColumnStats> {
    curves
        .iter()
        .map(|(name, values)| {
            let sum: f64 = values.iter().sum();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = if values.is_empty() { 0.0 } else { sum / values.len() as f64 };
            ColumnStats {
                column: name.to_string(),
                sum,
                min: if values.is_empty() { 0.0 } else { min },
                max: if values.is_empty() { 0.0 } else { max },
                mean,
            }
        })
        .collect()
}
