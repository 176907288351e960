//! Multi-year chart (MYC) batch operations.
//!
//! A MYC groups several scenarios, typically one per milestone year. The pool
//! fans requests out over a small rayon thread pool sharing one session and
//! returns results in the order of the scenario ids. The first failing
//! scenario fails the batch.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use reqwest::Url;
use tracing::{info, warn};

use crate::domain::{Carrier, CurveSet, ParameterTable, ScenarioId};
use crate::engine::{EngineSession, GqueryValue};
use crate::error::EngineError;

/// Concurrent requests against the engine.
pub const DEFAULT_POOL_SIZE: usize = 3;

pub struct ScenarioPool<'a> {
    session: &'a EngineSession,
    pool: rayon::ThreadPool,
}

impl<'a> ScenarioPool<'a> {
    pub fn new(session: &'a EngineSession, size: usize) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size.max(1))
            .thread_name(|i| format!("etm-myc-{i}"))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to start worker pool: {e}")))?;
        Ok(Self { session, pool })
    }

    fn run<T, F>(&self, ids: &[ScenarioId], task: F) -> Result<Vec<T>, EngineError>
    where
        T: Send,
        F: Fn(&EngineSession, ScenarioId) -> Result<T, EngineError> + Sync,
    {
        let session = self.session;
        self.pool
            .install(|| ids.par_iter().map(|&id| task(session, id)).collect())
    }

    /// Set the user values of every scenario column of `table`.
    ///
    /// Column headers are scenario ids; empty cells are left untouched.
    pub fn apply(&self, table: &ParameterTable) -> Result<Vec<ScenarioId>, EngineError> {
        let ids = scenario_columns(table)?;
        let columns: Vec<(ScenarioId, BTreeMap<String, f64>)> = ids
            .iter()
            .enumerate()
            .map(|(s, &id)| (id, table.scenario_values(s).into_iter().collect()))
            .collect();

        self.run(&ids, |session, id| {
            let values = columns
                .iter()
                .find(|(column, _)| *column == id)
                .map(|(_, values)| values)
                .ok_or_else(|| EngineError::Invalid(format!("no parameters for scenario {id}")))?;
            session.set_user_values(id, values)
        })?;

        info!(scenarios = ids.len(), keys = table.keys().len(), "applied parameters");
        Ok(ids)
    }

    /// Collect parameters into a keys x scenarios table.
    ///
    /// With `complete` the defaults of untouched inputs are included,
    /// otherwise only user values. `keys` restricts the rows.
    pub fn collect(
        &self,
        ids: &[ScenarioId],
        complete: bool,
        keys: Option<&[String]>,
    ) -> Result<ParameterTable, EngineError> {
        let per_scenario = self.run(ids, |session, id| {
            if complete {
                session.scenario_parameters(id)
            } else {
                session.user_values(id)
            }
        })?;

        let mut table = merge_columns(ids, per_scenario)?;
        if let Some(keys) = keys {
            table = restrict_rows(&table, keys)?;
        }
        Ok(table)
    }

    /// Future values of numeric graph queries per scenario.
    pub fn collect_gqueries(&self, ids: &[ScenarioId], gqueries: &[String]) -> Result<ParameterTable, EngineError> {
        let per_scenario = self.run(ids, |session, id| {
            let results = session.gquery_results(id, gqueries)?;
            Ok(results
                .into_iter()
                .filter_map(|(key, result)| match result.future {
                    Some(GqueryValue::Number(v)) => Some((key, v)),
                    _ => {
                        warn!(scenario = %id, gquery = %key, unit = %result.unit, "skipping non-numeric gquery");
                        None
                    }
                })
                .collect::<BTreeMap<_, _>>())
        })?;

        merge_columns(ids, per_scenario)
    }

    /// Hourly curves of one carrier for every scenario.
    pub fn carrier_curves(&self, ids: &[ScenarioId], carrier: Carrier) -> Result<Vec<CurveSet>, EngineError> {
        self.run(ids, |session, id| session.hourly_curves(id, carrier))
    }
}

/// Parse the scenario column headers of a parameter table.
pub fn scenario_columns(table: &ParameterTable) -> Result<Vec<ScenarioId>, EngineError> {
    table
        .scenarios()
        .iter()
        .map(|s| {
            s.parse::<ScenarioId>()
                .map_err(|_| EngineError::Invalid(format!("'{s}' is not a scenario id")))
        })
        .collect()
}

fn merge_columns(ids: &[ScenarioId], columns: Vec<BTreeMap<String, f64>>) -> Result<ParameterTable, EngineError> {
    let keys: BTreeSet<&String> = columns.iter().flat_map(|c| c.keys()).collect();
    let values: Vec<Vec<Option<f64>>> = keys
        .iter()
        .map(|key| columns.iter().map(|c| c.get(*key).copied()).collect())
        .collect();

    ParameterTable::new(
        keys.into_iter().cloned().collect(),
        ids.iter().map(ScenarioId::to_string).collect(),
        values,
    )
    .map_err(|e| EngineError::Invalid(e.to_string()))
}

fn restrict_rows(table: &ParameterTable, keys: &[String]) -> Result<ParameterTable, EngineError> {
    let values: Vec<Vec<Option<f64>>> = keys
        .iter()
        .map(|key| {
            let row = table.keys().iter().position(|k| k == key);
            (0..table.scenarios().len())
                .map(|s| row.and_then(|r| table.get(r, s)))
                .collect()
        })
        .collect();

    ParameterTable::new(keys.to_vec(), table.scenarios().to_vec(), values)
        .map_err(|e| EngineError::Invalid(e.to_string()))
}

/// URL of a multi-year chart over `ids`, with an optional sub-path and query.
pub fn make_myc_url(
    base: &str,
    ids: &[ScenarioId],
    path: Option<&str>,
    params: &[(String, String)],
) -> Result<String, EngineError> {
    let base = Url::parse(base).map_err(|e| EngineError::Config(format!("invalid MYC URL '{base}': {e}")))?;
    let joined = ids.iter().map(ScenarioId::to_string).collect::<Vec<_>>().join(",");
    let mut url = base
        .join(&joined)
        .map_err(|e| EngineError::Config(format!("invalid MYC URL: {e}")))?;

    if let Some(path) = path {
        let full = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/').trim_end_matches('/')
        );
        url.set_path(&full);
    }

    if !params.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(params);
    }

    Ok(url.to_string())
}
