//! Formatted terminal output.
//!
//! Formatting lives in one place so output changes stay localized and the
//! transforms and engine code never print.

use std::collections::BTreeMap;

use crate::domain::CurveSet;
use crate::engine::{CustomCurve, GqueryResult, GqueryValue, SavedScenario, ScenarioHeader};
use crate::report::{ColumnStats, summarize};

/// Column statistics table for a curve set.
pub fn format_curve_summary(curves: &CurveSet) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: {} | Columns: {}\n\n",
        curves.n_rows(),
        curves.n_columns()
    ));
    out.push_str(&format_stats_table(&summarize(curves)));
    out
}

fn format_stats_table(stats: &[ColumnStats]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<40} {:>14} {:>12} {:>12} {:>12}\n",
            "column", "sum", "min", "max", "mean"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<40} {:-<14} {:-<12} {:-<12} {:-<12}", "", "", "", "", "").trim_end());
    out.push('\n');

    for s in stats {
        out.push_str(
            format!(
                "{:<40} {:>14.2} {:>12.2} {:>12.2} {:>12.2}",
                truncate(&s.column, 40),
                s.sum,
                s.min,
                s.max,
                s.mean
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Scenario header as `key: value` lines.
pub fn format_header(header: &ScenarioHeader) -> String {
    let mut out = String::new();
    out.push_str(&format!("Scenario: {}\n", header.id));
    out.push_str(&format!("Area: {}\n", header.area_code.as_deref().unwrap_or("-")));
    out.push_str(&format!(
        "Years: {} -> {}\n",
        fmt_opt(header.start_year),
        fmt_opt(header.end_year)
    ));
    out.push_str(&format!("Private: {}\n", fmt_opt(header.private)));
    out.push_str(&format!("Keep compatible: {}\n", fmt_opt(header.keep_compatible)));
    if let Some(source) = &header.source {
        out.push_str(&format!("Source: {source}\n"));
    }
    if let Some(created) = header.created_at {
        out.push_str(&format!("Created: {}\n", created.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(updated) = header.updated_at {
        out.push_str(&format!("Updated: {}\n", updated.format("%Y-%m-%d %H:%M UTC")));
    }
    if !header.metadata.is_empty() {
        out.push_str("Metadata:\n");
        for (key, value) in &header.metadata {
            out.push_str(&format!("  {key}: {value}\n"));
        }
    }
    out
}

/// One line per scenario of an account listing.
pub fn format_scenario_list(scenarios: &[ScenarioHeader]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>9} {:<16} {:>8} {:<8} {:<16}", "id", "area", "end year", "private", "updated").trim_end());
    out.push('\n');
    out.push_str(format!("{:->9} {:-<16} {:->8} {:-<8} {:-<16}", "", "", "", "", "").trim_end());
    out.push('\n');
    for s in scenarios {
        let updated = s.updated_at.map(|t| t.format("%Y-%m-%d %H:%M").to_string());
        out.push_str(
            format!(
                "{:>9} {:<16} {:>8} {:<8} {:<16}",
                s.id,
                truncate(s.area_code.as_deref().unwrap_or("-"), 16),
                fmt_opt(s.end_year),
                fmt_opt(s.private),
                updated.unwrap_or_else(|| "-".to_string())
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Saved scenarios with their current scenario and history length.
pub fn format_saved_scenarios(saved: &[SavedScenario]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>7} {:<32} {:>9} {:>7} {:<8}", "id", "title", "scenario", "history", "private").trim_end());
    out.push('\n');
    out.push_str(format!("{:->7} {:-<32} {:->9} {:->7} {:-<8}", "", "", "", "", "").trim_end());
    out.push('\n');
    for s in saved {
        out.push_str(
            format!(
                "{:>7} {:<32} {:>9} {:>7} {:<8}",
                s.id,
                truncate(s.title.as_deref().unwrap_or(""), 32),
                s.scenario_id,
                s.scenario_id_history.len(),
                fmt_opt(s.private)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Key/value listing of parameters.
pub fn format_parameters(values: &BTreeMap<String, f64>) -> String {
    let width = values.keys().map(|k| k.len()).max().unwrap_or(0).max(3);
    let mut out = String::new();
    for (key, value) in values {
        out.push_str(&format!("{key:<width$} {value}\n"));
    }
    out
}

/// Custom curve overview table.
pub fn format_custom_curves(curves: &[CustomCurve]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<48} {:<9} {:<24} {:>9}", "key", "attached", "name", "overrides").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<48} {:-<9} {:-<24} {:-<9}", "", "", "", "").trim_end());
    out.push('\n');
    for c in curves {
        out.push_str(
            format!(
                "{:<48} {:<9} {:<24} {:>9}",
                truncate(&c.key, 48),
                c.attached,
                truncate(c.name.as_deref().unwrap_or(""), 24),
                c.overrides.len()
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Graph query results; curves are reduced to their length.
pub fn format_gqueries(results: &BTreeMap<String, GqueryResult>) -> String {
    let width = results.keys().map(|k| k.len()).max().unwrap_or(0).max(6);
    let mut out = String::new();
    out.push_str(format!("{:<width$} {:>10} {:>16} {:>16}", "gquery", "unit", "present", "future").trim_end());
    out.push('\n');
    for (key, r) in results {
        out.push_str(
            format!(
                "{key:<width$} {:>10} {:>16} {:>16}",
                truncate(&r.unit, 10),
                fmt_gquery(r.present.as_ref()),
                fmt_gquery(r.future.as_ref())
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_gquery(value: Option<&GqueryValue>) -> String {
    match value {
        Some(GqueryValue::Number(v)) => format!("{v:.3}"),
        Some(GqueryValue::Curve(c)) => format!("<{} values>", c.len()),
        None => "-".to_string(),
    }
}

fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_summary_lists_every_column() {
        let curves = CurveSet::hourly(vec![
            ("fossil".to_string(), vec![1.0, 2.0]),
            ("renewables".to_string(), vec![150.0, 50.0]),
        ])
        .unwrap();

        let text = format_curve_summary(&curves);
        assert!(text.starts_with("Rows: 2 | Columns: 2\n"));
        assert!(text.contains("fossil"));
        assert!(text.contains("200.00"));
    }

    #[test]
    fn parameters_are_aligned() {
        let values = BTreeMap::from([("a".to_string(), 1.5), ("long_key".to_string(), 2.0)]);
        assert_eq!(format_parameters(&values), "a        1.5\nlong_key 2\n");
    }

    #[test]
    fn saved_scenarios_show_history_length() {
        let saved: SavedScenario = serde_json::from_value(serde_json::json!({
            "id": 7, "scenario_id": 103, "title": "Regional", "scenario_id_history": [101, 102]
        }))
        .unwrap();

        let text = format_saved_scenarios(&[saved]);
        let row = text.lines().nth(2).unwrap();
        assert_eq!(row.split_whitespace().collect::<Vec<_>>(), ["7", "Regional", "103", "2", "-"]);
    }

    #[test]
    fn scenario_list_fills_missing_fields() {
        let header: ScenarioHeader = serde_json::from_value(serde_json::json!({"id": 101, "end_year": 2050})).unwrap();
        let text = format_scenario_list(&[header]);
        assert_eq!(text.lines().nth(2).unwrap().split_whitespace().collect::<Vec<_>>(), ["101", "-", "2050", "-", "-"]);
    }

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
