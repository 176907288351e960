//! Shared fixtures for integration tests.

#![allow(dead_code)]

use etm_client::domain::{CurveSet, FractionTable};

/// Hour-indexed curve set from `(name, values)` pairs.
pub fn curves(columns: &[(&str, &[f64])]) -> CurveSet {
    CurveSet::hourly(
        columns
            .iter()
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect(),
    )
    .unwrap()
}

/// Fraction table from `(node, [(column, fraction)])` rows.
pub fn fractions(rows: &[(&str, &[(&str, f64)])]) -> FractionTable {
    FractionTable::from_rows(
        rows.iter()
            .map(|(node, cells)| (node.to_string(), cells.to_vec()))
            .collect(),
    )
    .unwrap()
}

/// Two categories over two nodes, fractions summing to 1 per column.
pub fn north_south() -> FractionTable {
    fractions(&[
        ("north", &[("renewables", 0.3), ("fossil", 0.6)]),
        ("south", &[("renewables", 0.7), ("fossil", 0.4)]),
    ])
}

/// Hourly engine-style merit order curves that balance in every hour.
pub const MERIT_ORDER_CSV: &str = "Time,energy_power_wind_turbine_inland.output (MW),\
energy_power_solar_pv_solar_radiation.output (MW),households_final_demand_electricity.input (MW)\n\
2050-01-01 00:00,100.0,0.0,100.0\n\
2050-01-01 01:00,80.0,20.0,100.0\n\
2050-01-01 02:00,60.5,50.0,110.5\n";
