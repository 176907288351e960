//! Excel workbooks (`.xlsx`) as an alternative to CSV for every table.
//!
//! Reading picks the sheet named after the table (`curves`, `mapping`,
//! `regionalisation`, `parameters`, case-insensitive) and falls back to the
//! first sheet. Cells are turned into text so the CSV parsers apply unchanged.
//! Writing produces one sheet with a bold header row and frozen panes.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use csv::StringRecord;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::domain::{CurveSet, ParameterTable};
use crate::error::AppError;
use crate::io::tables::normalize_header_name;

const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

pub(crate) fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
}

/// Header row and data rows of the sheet holding `what`.
pub(crate) fn read_sheet(path: &Path, what: &str) -> Result<(Vec<String>, Vec<StringRecord>), AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::new(2, format!("Failed to open {what} workbook '{}': {e}", path.display())))?;

    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|name| name.trim().eq_ignore_ascii_case(what))
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| AppError::new(2, format!("The {what} workbook '{}' has no sheets.", path.display())))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| AppError::new(3, format!("Failed to read sheet '{sheet}' of '{}': {e}", path.display())))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(|cell| normalize_header_name(&cell_text(cell))).collect(),
        None => Vec::new(),
    };
    if headers.is_empty() {
        return Err(AppError::new(2, format!("The {what} sheet '{sheet}' has no columns.")));
    }

    let records = rows
        .filter(|row| !row.iter().all(|cell| matches!(cell, Data::Empty)))
        .map(|row| StringRecord::from(row.iter().map(cell_text).collect::<Vec<_>>()))
        .collect();

    Ok((headers, records))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        other => other.to_string(),
    }
}

/// Write a curve set to a workbook with a `Time` index column.
pub(crate) fn save_curves_xlsx(path: &Path, curves: &CurveSet) -> Result<(), AppError> {
    check_size("curves", curves.n_rows() + 1, curves.n_columns() + 1)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    fill_curves(sheet, curves).map_err(|e| write_error("curves", e))?;
    workbook.save(path).map_err(|e| write_error("curves", e))
}

fn fill_curves(sheet: &mut Worksheet, curves: &CurveSet) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    sheet.set_name("curves")?;
    sheet.write_string_with_format(0, 0, "Time", &bold)?;

    for (col, (name, values)) in curves.iter().enumerate() {
        let col = col as u16 + 1;
        sheet.write_string_with_format(0, col, name, &bold)?;
        for (row, value) in values.iter().enumerate() {
            sheet.write_number(row as u32 + 1, col, *value)?;
        }
    }
    for (row, label) in curves.index().iter().enumerate() {
        sheet.write_string(row as u32 + 1, 0, label)?;
    }

    sheet.set_freeze_panes(1, 1)?;
    Ok(())
}

/// Write a parameter table to a workbook; gaps stay empty cells.
pub(crate) fn save_parameters_xlsx(path: &Path, table: &ParameterTable) -> Result<(), AppError> {
    check_size("parameters", table.keys().len() + 1, table.scenarios().len() + 1)?;

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    fill_parameters(sheet, table).map_err(|e| write_error("parameters", e))?;
    workbook.save(path).map_err(|e| write_error("parameters", e))
}

fn fill_parameters(sheet: &mut Worksheet, table: &ParameterTable) -> Result<(), XlsxError> {
    let bold = Format::new().set_bold();
    sheet.set_name("parameters")?;
    sheet.write_string_with_format(0, 0, "key", &bold)?;

    for (s, scenario) in table.scenarios().iter().enumerate() {
        sheet.write_string_with_format(0, s as u16 + 1, scenario, &bold)?;
    }
    for (k, key) in table.keys().iter().enumerate() {
        let row = k as u32 + 1;
        sheet.write_string(row, 0, key)?;
        for s in 0..table.scenarios().len() {
            if let Some(value) = table.get(k, s) {
                sheet.write_number(row, s as u16 + 1, value)?;
            }
        }
    }

    sheet.set_freeze_panes(1, 1)?;
    Ok(())
}

fn check_size(what: &str, rows: usize, columns: usize) -> Result<(), AppError> {
    if rows > MAX_ROWS || columns > MAX_COLUMNS {
        return Err(AppError::new(
            2,
            format!("The {what} table ({rows} x {columns}) exceeds the worksheet limit of {MAX_ROWS} x {MAX_COLUMNS}."),
        ));
    }
    Ok(())
}

fn write_error(what: &str, err: XlsxError) -> AppError {
    AppError::new(2, format!("Failed to write {what} workbook: {err}"))
}
