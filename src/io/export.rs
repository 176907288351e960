//! Export curve sets and parameter tables.
//!
//! Curve sets are written with a leading `Time` index column so they can be
//! read back with `io::load_curves`. A `.json` extension selects JSON output,
//! `.xlsx` an Excel workbook.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{CurveSet, ParameterTable};
use crate::error::AppError;
use crate::io::excel;

/// Write a curve set to CSV, JSON (`.json`) or a workbook (`.xlsx`).
pub fn save_curves(path: &Path, curves: &CurveSet) -> Result<(), AppError> {
    if excel::is_xlsx(path) {
        return excel::save_curves_xlsx(path, curves);
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curves file '{}': {e}", path.display())))?;

    if is_json(path) {
        serde_json::to_writer_pretty(file, curves)
            .map_err(|e| AppError::new(2, format!("Failed to write curves JSON: {e}")))?;
        return Ok(());
    }

    write_curves(file, curves)
}

/// Write a curve set as CSV to any writer.
pub fn write_curves<W: Write>(writer: W, curves: &CurveSet) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["Time"];
    header.extend(curves.columns().iter().map(String::as_str));
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write curves CSV header: {e}")))?;

    let series: Vec<&[f64]> = curves.iter().map(|(_, s)| s).collect();
    for (row, label) in curves.index().iter().enumerate() {
        let mut record = Vec::with_capacity(series.len() + 1);
        record.push(label.clone());
        record.extend(series.iter().map(|s| s[row].to_string()));
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write curves CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush curves CSV: {e}")))?;
    Ok(())
}

/// Write a parameter table (keys x scenarios) to CSV, or a workbook (`.xlsx`).
pub fn save_parameters(path: &Path, table: &ParameterTable) -> Result<(), AppError> {
    if excel::is_xlsx(path) {
        return excel::save_parameters_xlsx(path, table);
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create parameters file '{}': {e}", path.display())))?;
    write_parameters(file, table)
}

pub fn write_parameters<W: Write>(writer: W, table: &ParameterTable) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["key"];
    header.extend(table.scenarios().iter().map(String::as_str));
    out.write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write parameters CSV header: {e}")))?;

    for (k, key) in table.keys().iter().enumerate() {
        let mut record = vec![key.clone()];
        for s in 0..table.scenarios().len() {
            record.push(table.get(k, s).map(|v| v.to_string()).unwrap_or_default());
        }
        out.write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write parameters CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush parameters CSV: {e}")))?;
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
