//! Shared domain types.
//!
//! The tables here are deliberately small, explicit structures rather than a
//! general dataframe:
//!
//! - `CurveSet`: time-indexed columns of hourly values
//! - `MappingTable`: curve key -> labels (+ sign)
//! - `FractionTable`: node x category allocation fractions
//!
//! Constructors validate shape, so the transforms can rely on it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Suffix the engine uses for consumption (demand) columns.
pub const INPUT_SUFFIX: &str = ".input (MW)";
/// Suffix the engine uses for production (supply) columns.
pub const OUTPUT_SUFFIX: &str = ".output (MW)";

/// Default mapping column holding the category label.
pub const DEFAULT_LABEL_COLUMN: &str = "category";

/// How validation findings are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandling {
    /// Log at debug level and carry on.
    Ignore,
    /// Log a warning and carry on.
    #[default]
    Warn,
    /// Return an error.
    Raise,
}

/// What the categoriser does with curve columns missing from the mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedPolicy {
    /// Fail with an unmapped-key error listing every missing column.
    #[default]
    Strict,
    /// Leave unmapped columns out of the result.
    Drop,
}

/// Sign convention applied to raw engine flow columns before aggregation.
///
/// The engine reports both demand (`.input (MW)`) and supply (`.output (MW)`)
/// as positive numbers. Summing them into one category requires one side to be
/// negated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FlowSign {
    /// Demand negative, supply positive.
    #[default]
    DemandNegative,
    /// Supply negative, demand positive.
    SupplyNegative,
    /// Leave values as reported.
    None,
}

impl FlowSign {
    /// Multiplier for a column with the given name.
    pub fn factor(self, column: &str) -> f64 {
        match self {
            FlowSign::DemandNegative if column.ends_with(INPUT_SUFFIX) => -1.0,
            FlowSign::SupplyNegative if column.ends_with(OUTPUT_SUFFIX) => -1.0,
            _ => 1.0,
        }
    }
}

/// Carriers for which the engine publishes hourly curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Electricity,
    Heat,
    Hydrogen,
    Methane,
}

impl Carrier {
    /// Curve endpoint name on the engine.
    pub fn endpoint(self) -> &'static str {
        match self {
            Carrier::Electricity => "merit_order",
            Carrier::Heat => "heat_network",
            Carrier::Hydrogen => "hydrogen",
            Carrier::Methane => "network_gas",
        }
    }
}

/// Numeric scenario identifier on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub u64);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ScenarioId)
    }
}

/// Time-indexed set of named curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSet {
    index: Vec<String>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CurveSet {
    /// Build a curve set from row labels and `(name, values)` columns.
    ///
    /// Row labels must be unique, as must column names.
    pub fn new(index: Vec<String>, columns: Vec<(String, Vec<f64>)>) -> Result<Self, TransformError> {
        ensure_unique("curve index", &index)?;

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());

        for (name, series) in columns {
            if !seen.insert(name.clone()) {
                return Err(TransformError::DuplicateLabel { what: "curve column", label: name });
            }
            if series.len() != index.len() {
                return Err(TransformError::Shape(format!(
                    "column '{name}' has {} values, index has {} rows",
                    series.len(),
                    index.len()
                )));
            }
            if series.iter().any(|v| !v.is_finite()) {
                return Err(TransformError::NonFinite { what: "curve column", label: name });
            }
            names.push(name);
            values.push(series);
        }

        Ok(Self {
            index,
            columns: names,
            values,
        })
    }

    /// Curve set indexed by hour number `0..n`.
    pub fn hourly(columns: Vec<(String, Vec<f64>)>) -> Result<Self, TransformError> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let index = (0..rows).map(|h| h.to_string()).collect();
        Self::new(index, columns)
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.position(name).map(|i| self.values[i].as_slice())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over `(name, values)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Subset of columns, in the order requested.
    pub fn select_columns<S: AsRef<str>>(&self, keys: &[S]) -> Result<Self, TransformError> {
        let missing: Vec<String> = keys
            .iter()
            .map(|k| k.as_ref())
            .filter(|k| self.position(k).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(TransformError::UnknownColumn(missing));
        }

        let columns = keys
            .iter()
            .map(|k| {
                let k = k.as_ref();
                (k.to_string(), self.column(k).unwrap_or_default().to_vec())
            })
            .collect();
        Self::new(self.index.clone(), columns)
    }

    /// Subset of rows by position, in the order requested.
    pub fn select_rows(&self, positions: &[usize]) -> Result<Self, TransformError> {
        let len = self.n_rows();
        if let Some(&position) = positions.iter().find(|&&p| p >= len) {
            return Err(TransformError::RowOutOfRange { position, len });
        }

        let index = positions.iter().map(|&p| self.index[p].clone()).collect();
        let columns = self
            .iter()
            .map(|(name, series)| (name.to_string(), positions.iter().map(|&p| series[p]).collect()))
            .collect();
        Self::new(index, columns)
    }
}

/// One row of a mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Label columns, e.g. `category -> "renewables"`.
    pub labels: HashMap<String, String>,
    /// Multiplier applied after the flow sign convention.
    pub sign: f64,
}

/// Lookup from original curve key to category labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTable {
    keys: Vec<String>,
    entries: HashMap<String, MappingEntry>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-label mapping with unit signs, e.g. `[("wind", "renewables")]`.
    pub fn from_pairs<K, L>(pairs: impl IntoIterator<Item = (K, L)>) -> Result<Self, TransformError>
    where
        K: Into<String>,
        L: Into<String>,
    {
        let mut table = Self::new();
        for (key, label) in pairs {
            table.insert(key, [(DEFAULT_LABEL_COLUMN, label)], 1.0)?;
        }
        Ok(table)
    }

    /// Add an entry; keys must be unique.
    pub fn insert<K, C, L>(
        &mut self,
        key: K,
        labels: impl IntoIterator<Item = (C, L)>,
        sign: f64,
    ) -> Result<(), TransformError>
    where
        K: Into<String>,
        C: Into<String>,
        L: Into<String>,
    {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(TransformError::DuplicateLabel { what: "mapping key", label: key });
        }
        if !sign.is_finite() {
            return Err(TransformError::NonFinite { what: "mapping sign", label: key });
        }
        let labels = labels.into_iter().map(|(c, l)| (c.into(), l.into())).collect();
        self.keys.push(key.clone());
        self.entries.insert(key, MappingEntry { labels, sign });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&MappingEntry> {
        self.entries.get(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Reference to a node in a fraction table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Label(String),
    Position(usize),
}

impl From<&str> for NodeRef {
    fn from(label: &str) -> Self {
        NodeRef::Label(label.to_string())
    }
}

impl From<usize> for NodeRef {
    fn from(position: usize) -> Self {
        NodeRef::Position(position)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Label(label) => write!(f, "{label}"),
            NodeRef::Position(p) => write!(f, "#{p}"),
        }
    }
}

/// Allocation fractions per node (rows) and category (columns).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractionTable {
    nodes: Vec<String>,
    columns: Vec<String>,
    /// Row-major: `values[node][column]`.
    values: Vec<Vec<f64>>,
}

impl FractionTable {
    pub fn new(
        nodes: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, TransformError> {
        ensure_unique("node", &nodes)?;
        ensure_unique("fraction column", &columns)?;

        if values.len() != nodes.len() {
            return Err(TransformError::Shape(format!(
                "{} fraction rows for {} nodes",
                values.len(),
                nodes.len()
            )));
        }
        for (node, row) in nodes.iter().zip(&values) {
            if row.len() != columns.len() {
                return Err(TransformError::Shape(format!(
                    "node '{node}' has {} fractions, table has {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(TransformError::NonFinite { what: "fraction row", label: node.clone() });
            }
        }

        Ok(Self { nodes, columns, values })
    }

    /// Build from `(node, [(column, fraction)])` rows; columns follow first appearance.
    ///
    /// Every node must list every column; a gap is a shape error, never a zero.
    pub fn from_rows<N, C>(rows: Vec<(N, Vec<(C, f64)>)>) -> Result<Self, TransformError>
    where
        N: Into<String>,
        C: Into<String>,
    {
        let rows: Vec<(String, Vec<(String, f64)>)> = rows
            .into_iter()
            .map(|(n, cells)| (n.into(), cells.into_iter().map(|(c, v)| (c.into(), v)).collect()))
            .collect();

        let mut columns: Vec<String> = Vec::new();
        for (_, cells) in &rows {
            for (c, _) in cells {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut nodes = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (node, cells) in rows {
            let mut row: Vec<Option<f64>> = vec![None; columns.len()];
            for (c, v) in cells {
                if let Some(i) = columns.iter().position(|x| *x == c) {
                    if row[i].replace(v).is_some() {
                        return Err(TransformError::DuplicateLabel { what: "fraction column", label: c });
                    }
                }
            }
            let missing: Vec<&str> = columns
                .iter()
                .zip(&row)
                .filter(|(_, v)| v.is_none())
                .map(|(c, _)| c.as_str())
                .collect();
            if !missing.is_empty() {
                return Err(TransformError::Shape(format!(
                    "node '{node}' has no fraction for column(s): {}",
                    missing.join(", ")
                )));
            }
            nodes.push(node);
            values.push(row.into_iter().flatten().collect());
        }

        Self::new(nodes, columns, values)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Subset of columns, in the order requested.
    pub fn select_columns<S: AsRef<str>>(&self, keys: &[S]) -> Result<Self, TransformError> {
        let positions = keys
            .iter()
            .map(|k| {
                self.column_position(k.as_ref())
                    .ok_or_else(|| TransformError::MissingKeys(vec![k.as_ref().to_string()]))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let columns = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let values = self
            .values
            .iter()
            .map(|row| positions.iter().map(|&p| row[p]).collect())
            .collect();
        Self::new(self.nodes.clone(), columns, values)
    }

    /// Resolve a node reference to a row position.
    pub fn node_position(&self, node: &NodeRef) -> Result<usize, TransformError> {
        match node {
            NodeRef::Label(label) => self
                .nodes
                .iter()
                .position(|n| n == label)
                .ok_or_else(|| TransformError::UnknownNode(label.clone())),
            NodeRef::Position(p) if *p < self.nodes.len() => Ok(*p),
            NodeRef::Position(_) => Err(TransformError::UnknownNode(node.to_string())),
        }
    }

    pub fn value(&self, node: usize, column: usize) -> f64 {
        self.values[node][column]
    }

    /// Sum of fractions over all nodes, per column.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.columns.len()];
        for row in &self.values {
            for (acc, v) in sums.iter_mut().zip(row) {
                *acc += v;
            }
        }
        sums
    }
}

/// Parameter values per scenario: rows are input keys, columns are scenarios.
///
/// Empty cells are `None` and are not sent to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    keys: Vec<String>,
    scenarios: Vec<String>,
    /// Row-major: `values[key][scenario]`.
    values: Vec<Vec<Option<f64>>>,
}

impl ParameterTable {
    pub fn new(
        keys: Vec<String>,
        scenarios: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, TransformError> {
        ensure_unique("parameter key", &keys)?;
        ensure_unique("scenario", &scenarios)?;
        if values.len() != keys.len() || values.iter().any(|row| row.len() != scenarios.len()) {
            return Err(TransformError::Shape(format!(
                "parameter table expects {} rows of {} values",
                keys.len(),
                scenarios.len()
            )));
        }
        Ok(Self { keys, scenarios, values })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn scenarios(&self) -> &[String] {
        &self.scenarios
    }

    pub fn get(&self, key: usize, scenario: usize) -> Option<f64> {
        self.values[key][scenario]
    }

    /// Non-empty `(key, value)` pairs for one scenario column.
    pub fn scenario_values(&self, scenario: usize) -> Vec<(String, f64)> {
        self.keys
            .iter()
            .zip(&self.values)
            .filter_map(|(k, row)| row[scenario].map(|v| (k.clone(), v)))
            .collect()
    }
}

fn ensure_unique(what: &'static str, labels: &[String]) -> Result<(), TransformError> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(TransformError::DuplicateLabel { what, label: label.clone() });
        }
    }
    Ok(())
}
