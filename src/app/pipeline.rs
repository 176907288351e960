//! Shared curve pipeline steps used by several commands.
//!
//! Keeping this in one place avoids duplicating the file workflow:
//! load curves -> subset sectors/hours -> load fractions -> resolve nodes

use crate::cli::FractionInput;
use crate::domain::{CurveSet, FractionTable, MappingTable, NodeRef};
use crate::error::AppError;
use crate::io::{load_curves, load_fractions};
use crate::transform::{CategoriseOptions, categorise, categorise_keys};

/// Curves and fractions ready for regionalisation.
#[derive(Debug, Clone)]
pub struct FractionRun {
    pub curves: CurveSet,
    pub fractions: FractionTable,
}

/// Load curves and fractions, restricted to the requested sectors and hours.
///
/// Sectors narrow the fraction table too, so unselected fraction columns are
/// not reported as unused.
pub fn load_fraction_input(input: &FractionInput) -> Result<FractionRun, AppError> {
    let curves = load_curves(&input.curves)?;
    let curves = subset(curves, input.sectors.as_deref(), input.hours.as_deref())?;
    let fractions = load_fractions(&input.fractions)?;
    let fractions = match input.sectors.as_deref() {
        Some(keys) => fractions.select_columns(keys)?,
        None => fractions,
    };
    Ok(FractionRun { curves, fractions })
}

/// Apply optional column and row selections.
pub fn subset(
    curves: CurveSet,
    sectors: Option<&[String]>,
    hours: Option<&[usize]>,
) -> Result<CurveSet, AppError> {
    let curves = match sectors {
        Some(keys) => curves.select_columns(keys)?,
        None => curves,
    };
    let curves = match hours {
        Some(positions) => curves.select_rows(positions)?,
        None => curves,
    };
    Ok(curves)
}

/// Interpret a command-line node: a known label wins, otherwise a number is
/// taken as a row position.
pub fn resolve_node(fractions: &FractionTable, raw: &str) -> NodeRef {
    if fractions.nodes().iter().any(|n| n == raw) {
        return NodeRef::from(raw);
    }
    match raw.parse::<usize>() {
        Ok(position) => NodeRef::from(position),
        Err(_) => NodeRef::from(raw),
    }
}

/// Categorise with or without the original keys in the labels.
pub fn categorise_with(
    curves: &CurveSet,
    mapping: &MappingTable,
    options: &CategoriseOptions,
    keep_keys: bool,
) -> Result<CurveSet, AppError> {
    let out = if keep_keys {
        categorise_keys(curves, mapping, options)?
    } else {
        categorise(curves, mapping, options)?
    };
    Ok(out)
}
