//! Hourly output curves.

use tracing::debug;

use crate::domain::{Carrier, CurveSet, ScenarioId};
use crate::engine::scenario::scenario_path;
use crate::engine::session::EngineSession;
use crate::error::EngineError;
use crate::io::read_curves;

const PRICE_ENDPOINT: &str = "electricity_price";
const HOUSEHOLD_HEAT_ENDPOINT: &str = "household_heat";

impl EngineSession {
    /// Hourly curves of one carrier, indexed by the engine's `Time` column.
    ///
    /// Electricity curves come from the merit order, so the scenario must have
    /// it enabled.
    pub fn hourly_curves(&self, id: ScenarioId, carrier: Carrier) -> Result<CurveSet, EngineError> {
        if carrier == Carrier::Electricity {
            self.require_merit_order(id)?;
        }
        self.fetch_curves(id, carrier.endpoint())
    }

    /// Hourly electricity price, one column.
    pub fn electricity_price(&self, id: ScenarioId) -> Result<CurveSet, EngineError> {
        self.require_merit_order(id)?;
        self.fetch_curves(id, PRICE_ENDPOINT)
    }

    /// Household heat curves; these come without a time column.
    pub fn household_heat_curves(&self, id: ScenarioId) -> Result<CurveSet, EngineError> {
        self.fetch_curves(id, HOUSEHOLD_HEAT_ENDPOINT)
    }

    fn require_merit_order(&self, id: ScenarioId) -> Result<(), EngineError> {
        if self.merit_order_enabled(id)? {
            Ok(())
        } else {
            Err(EngineError::MeritOrderDisabled(id.0))
        }
    }

    fn fetch_curves(&self, id: ScenarioId, endpoint: &str) -> Result<CurveSet, EngineError> {
        let body = self.get_text(&format!("{}/curves/{endpoint}", scenario_path(id)))?;
        let curves = read_curves(body.as_bytes())
            .map_err(|e| EngineError::Decode(format!("{endpoint} curves: {e}")))?;
        debug!(scenario = %id, endpoint, rows = curves.n_rows(), columns = curves.n_columns(), "fetched curves");
        Ok(curves)
    }
}
