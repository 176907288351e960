//! Reading of curve sets, mapping tables, fraction tables and parameter tables.
//!
//! The `load_*` functions read CSV, or an Excel workbook when the path ends in
//! `.xlsx`; both go through the same parsers.
//!
//! Conventions:
//! - headers are trimmed and a UTF-8 BOM on the first header is stripped
//! - curve sets: a first column named `Time`, `time`, `hour` or left blank is
//!   the row index; otherwise rows are numbered `0..n`
//! - mapping tables: first column is the curve key, an optional `sign` column
//!   holds the multiplier, every other column is a label column
//! - fraction tables: first column is the node label
//! - parameter tables: first column is the input key, one column per scenario

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{CurveSet, FractionTable, MappingTable, ParameterTable};
use crate::error::AppError;
use crate::io::excel;

const INDEX_HEADERS: [&str; 3] = ["time", "hour", ""];
const SIGN_HEADER: &str = "sign";

/// Load a curve set CSV from disk.
pub fn load_curves(path: &Path) -> Result<CurveSet, AppError> {
    let (headers, records) = load_records(path, "curves")?;
    parse_curves(&headers, &records)
}

/// Parse a curve set CSV.
pub fn read_curves<R: Read>(reader: R) -> Result<CurveSet, AppError> {
    let (headers, records) = read_records(reader, "curves")?;
    parse_curves(&headers, &records)
}

fn parse_curves(headers: &[String], records: &[StringRecord]) -> Result<CurveSet, AppError> {
    let has_index = headers
        .first()
        .is_some_and(|h| INDEX_HEADERS.contains(&h.to_ascii_lowercase().as_str()));
    let first_value = usize::from(has_index);

    let names: Vec<String> = headers[first_value.min(headers.len())..].to_vec();
    let mut series: Vec<Vec<f64>> = vec![Vec::with_capacity(records.len()); names.len()];
    let mut index = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        let line = row + 2;
        if record.len() != headers.len() {
            return Err(AppError::new(
                3,
                format!(
                    "Curves line {line}: expected {} fields, found {}.",
                    headers.len(),
                    record.len()
                ),
            ));
        }
        index.push(if has_index {
            record[0].to_string()
        } else {
            row.to_string()
        });
        for (col, values) in series.iter_mut().enumerate() {
            let raw = &record[col + first_value];
            values.push(parse_f64(raw).ok_or_else(|| {
                AppError::new(
                    3,
                    format!("Curves line {line}: non-numeric value '{raw}' in column '{}'.", names[col]),
                )
            })?);
        }
    }

    Ok(CurveSet::new(index, names.into_iter().zip(series).collect())?)
}

/// Load a mapping table CSV from disk.
pub fn load_mapping(path: &Path) -> Result<MappingTable, AppError> {
    let (headers, records) = load_records(path, "mapping")?;
    parse_mapping(&headers, &records)
}

/// Parse a mapping table CSV.
pub fn read_mapping<R: Read>(reader: R) -> Result<MappingTable, AppError> {
    let (headers, records) = read_records(reader, "mapping")?;
    parse_mapping(&headers, &records)
}

fn parse_mapping(headers: &[String], records: &[StringRecord]) -> Result<MappingTable, AppError> {
    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "Mapping needs a key column and at least one label column.",
        ));
    }

    let sign_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(SIGN_HEADER))
        .filter(|&i| i > 0);
    let label_cols: Vec<usize> = (1..headers.len()).filter(|&i| Some(i) != sign_col).collect();
    if label_cols.is_empty() {
        return Err(AppError::new(2, "Mapping has no label column."));
    }

    let mut table = MappingTable::new();
    for (row, record) in records.iter().enumerate() {
        let line = row + 2;
        let key = record.get(0).unwrap_or_default();
        if key.is_empty() {
            return Err(AppError::new(3, format!("Mapping line {line}: empty key.")));
        }

        let sign = match sign_col.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) {
            Some(raw) => parse_f64(raw).ok_or_else(|| {
                AppError::new(3, format!("Mapping line {line}: invalid sign '{raw}'."))
            })?,
            None => 1.0,
        };

        let labels = label_cols
            .iter()
            .map(|&i| (headers[i].clone(), record.get(i).unwrap_or_default().to_string()));
        table.insert(key, labels, sign)?;
    }

    Ok(table)
}

/// Load a fraction (regionalisation) table CSV from disk.
pub fn load_fractions(path: &Path) -> Result<FractionTable, AppError> {
    let (headers, records) = load_records(path, "regionalisation")?;
    parse_fractions(&headers, &records)
}

/// Parse a fraction table CSV.
pub fn read_fractions<R: Read>(reader: R) -> Result<FractionTable, AppError> {
    let (headers, records) = read_records(reader, "regionalisation")?;
    parse_fractions(&headers, &records)
}

fn parse_fractions(headers: &[String], records: &[StringRecord]) -> Result<FractionTable, AppError> {
    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "Regionalisation needs a node column and at least one category column.",
        ));
    }

    let columns = headers[1..].to_vec();
    let mut nodes = Vec::with_capacity(records.len());
    let mut values = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        let line = row + 2;
        let node = record.get(0).unwrap_or_default().to_string();
        let mut fractions = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let raw = record.get(i + 1).unwrap_or_default();
            fractions.push(parse_f64(raw).ok_or_else(|| {
                AppError::new(
                    3,
                    format!("Regionalisation line {line}: non-numeric value '{raw}' in column '{column}'."),
                )
            })?);
        }
        nodes.push(node);
        values.push(fractions);
    }

    Ok(FractionTable::new(nodes, columns, values)?)
}

/// Load a parameter table CSV from disk.
pub fn load_parameters(path: &Path) -> Result<ParameterTable, AppError> {
    let (headers, records) = load_records(path, "parameters")?;
    parse_parameters(&headers, &records)
}

/// Parse a parameter table CSV; empty cells become `None`.
pub fn read_parameters<R: Read>(reader: R) -> Result<ParameterTable, AppError> {
    let (headers, records) = read_records(reader, "parameters")?;
    parse_parameters(&headers, &records)
}

fn parse_parameters(headers: &[String], records: &[StringRecord]) -> Result<ParameterTable, AppError> {
    if headers.len() < 2 {
        return Err(AppError::new(
            2,
            "Parameters need a key column and at least one scenario column.",
        ));
    }

    let scenarios = headers[1..].to_vec();
    let mut keys = Vec::with_capacity(records.len());
    let mut values = Vec::with_capacity(records.len());

    for (row, record) in records.iter().enumerate() {
        let line = row + 2;
        keys.push(record.get(0).unwrap_or_default().to_string());
        let mut cells = Vec::with_capacity(scenarios.len());
        for (i, scenario) in scenarios.iter().enumerate() {
            let raw = record.get(i + 1).unwrap_or_default();
            if raw.is_empty() {
                cells.push(None);
                continue;
            }
            cells.push(Some(parse_f64(raw).ok_or_else(|| {
                AppError::new(
                    3,
                    format!("Parameters line {line}: non-numeric value '{raw}' for scenario '{scenario}'."),
                )
            })?));
        }
        values.push(cells);
    }

    Ok(ParameterTable::new(keys, scenarios, values)?)
}

fn load_records(path: &Path, what: &str) -> Result<(Vec<String>, Vec<StringRecord>), AppError> {
    if excel::is_xlsx(path) {
        return excel::read_sheet(path, what);
    }
    read_records(open(path, what)?, what)
}

fn open(path: &Path, what: &str) -> Result<File, AppError> {
    File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open {what} CSV '{}': {e}", path.display())))
}

fn read_records<R: Read>(reader: R, what: &str) -> Result<(Vec<String>, Vec<StringRecord>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read {what} CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.is_empty() {
        return Err(AppError::new(2, format!("The {what} CSV has no columns.")));
    }

    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::new(3, format!("Failed to parse {what} CSV: {e}")))?;

    Ok((headers, records))
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_f64(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_curves_use_time_as_index() {
        let csv = "Time,wind.output (MW),households.input (MW)\n\
                   2050-01-01 00:00,10.5,3\n\
                   2050-01-01 01:00,11,4.25\n";
        let curves = read_curves(csv.as_bytes()).unwrap();
        assert_eq!(curves.index(), ["2050-01-01 00:00", "2050-01-01 01:00"]);
        assert_eq!(curves.columns(), ["wind.output (MW)", "households.input (MW)"]);
        assert_eq!(curves.column("households.input (MW)").unwrap(), [3.0, 4.25]);
    }

    #[test]
    fn curves_without_index_column_are_numbered() {
        let csv = "\u{feff}a,b\n1,2\n3,4\n";
        let curves = read_curves(csv.as_bytes()).unwrap();
        assert_eq!(curves.index(), ["0", "1"]);
        assert_eq!(curves.columns(), ["a", "b"]);
    }

    #[test]
    fn non_numeric_curve_values_are_rejected() {
        let err = read_curves("a,b\n1,x\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("column 'b'"));
    }

    #[test]
    fn duplicate_curve_columns_are_rejected() {
        let err = read_curves("a,a\n1,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn repeated_time_labels_are_rejected() {
        let csv = "Time,a\n2050-01-01 00:00,1\n2050-01-01 00:00,2\n";
        let err = read_curves(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("2050-01-01 00:00"));
    }

    #[test]
    fn ragged_fraction_rows_are_rejected() {
        let err = read_fractions("node,a,b\nnorth,0.5\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn mapping_with_sign_and_several_labels() {
        let csv = "key,category,sector,sign\n\
                   wind,renewables,power,\n\
                   gas,fossil,power,-1\n";
        let mapping = read_mapping(csv.as_bytes()).unwrap();
        assert_eq!(mapping.keys(), ["wind", "gas"]);

        let gas = mapping.get("gas").unwrap();
        assert_eq!(gas.sign, -1.0);
        assert_eq!(gas.labels["category"], "fossil");
        assert_eq!(gas.labels["sector"], "power");
        assert_eq!(mapping.get("wind").unwrap().sign, 1.0);
    }

    #[test]
    fn fraction_table_rows_are_nodes() {
        let csv = "node,renewables,fossil\nnorth,0.3,0.5\nsouth,0.7,0.5\n";
        let table = read_fractions(csv.as_bytes()).unwrap();
        assert_eq!(table.nodes(), ["north", "south"]);
        assert_eq!(table.columns(), ["renewables", "fossil"]);
        assert_eq!(table.value(1, 0), 0.7);
    }

    #[test]
    fn parameter_table_keeps_empty_cells_empty() {
        let csv = "key,2030,2050\ncapacity_of_wind,10,\nshare_of_ev,,0.5\n";
        let table = read_parameters(csv.as_bytes()).unwrap();
        assert_eq!(table.scenarios(), ["2030", "2050"]);
        assert_eq!(table.scenario_values(0), vec![("capacity_of_wind".to_string(), 10.0)]);
        assert_eq!(table.scenario_values(1), vec![("share_of_ev".to_string(), 0.5)]);
    }
}
