//! Input parameters, user values, orders and graph queries.

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::domain::ScenarioId;
use crate::engine::scenario::scenario_path;
use crate::engine::session::EngineSession;
use crate::error::EngineError;

const MERIT_ORDER_SETTING: &str = "settings_enable_merit_order";

/// One entry of `GET scenarios/{id}/inputs`.
///
/// `default` and `user` are kept as raw JSON: most inputs are numeric but a
/// few settings carry booleans or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParameter {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub share_group: Option<String>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

impl InputParameter {
    pub fn is_disabled(&self) -> bool {
        self.disabled.unwrap_or(false)
    }

    pub fn user_value(&self) -> Option<f64> {
        self.user.as_ref().and_then(numeric)
    }

    pub fn default_value(&self) -> Option<f64> {
        self.default.as_ref().and_then(numeric)
    }

    /// User value, falling back to the default.
    pub fn scenario_value(&self) -> Option<f64> {
        self.user_value().or_else(|| self.default_value())
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

/// Ordered technology lists the engine keeps per scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderKind {
    HeatNetwork,
    ForecastStorage,
}

impl OrderKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            OrderKind::HeatNetwork => "heat_network_order",
            OrderKind::ForecastStorage => "forecast_storage_order",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderKind::HeatNetwork => "heat network order",
            OrderKind::ForecastStorage => "forecast storage order",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OrderBody {
    order: Vec<String>,
}

/// Graph query value: a single number or an hourly curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GqueryValue {
    Number(f64),
    Curve(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GqueryResult {
    pub unit: String,
    #[serde(default)]
    pub present: Option<GqueryValue>,
    #[serde(default)]
    pub future: Option<GqueryValue>,
}

impl GqueryResult {
    pub fn is_curve(&self) -> bool {
        self.unit == "curve"
    }
}

#[derive(Debug, Deserialize)]
struct GqueryResponse {
    #[serde(default)]
    gqueries: BTreeMap<String, GqueryResult>,
}

impl EngineSession {
    /// All input parameters of a scenario, keyed by input key.
    pub fn inputs(&self, id: ScenarioId) -> Result<BTreeMap<String, InputParameter>, EngineError> {
        self.get_json(&format!("{}/inputs", scenario_path(id)), &[])
    }

    pub fn input(&self, id: ScenarioId, key: &str) -> Result<InputParameter, EngineError> {
        self.get_json(&format!("{}/inputs/{key}", scenario_path(id)), &[])
    }

    /// Values explicitly set by the user, excluding disabled inputs.
    pub fn user_values(&self, id: ScenarioId) -> Result<BTreeMap<String, f64>, EngineError> {
        Ok(self
            .inputs(id)?
            .into_iter()
            .filter(|(_, p)| !p.is_disabled())
            .filter_map(|(key, p)| p.user_value().map(|v| (key, v)))
            .collect())
    }

    /// User values completed with defaults for every enabled input.
    pub fn scenario_parameters(&self, id: ScenarioId) -> Result<BTreeMap<String, f64>, EngineError> {
        Ok(self
            .inputs(id)?
            .into_iter()
            .filter(|(_, p)| !p.is_disabled())
            .filter_map(|(key, p)| p.scenario_value().map(|v| (key, v)))
            .collect())
    }

    /// Set user values; the engine answers 422 for unknown keys or broken share groups.
    pub fn set_user_values(&self, id: ScenarioId, values: &BTreeMap<String, f64>) -> Result<(), EngineError> {
        if values.is_empty() {
            debug!(scenario = %id, "no user values to set");
            return Ok(());
        }

        let body = json!({ "scenario": { "user_values": values }, "detailed": true });
        let _: Value = self.put_json(&scenario_path(id), &body)?;
        info!(scenario = %id, count = values.len(), "updated user values");
        Ok(())
    }

    pub fn merit_order_enabled(&self, id: ScenarioId) -> Result<bool, EngineError> {
        let setting = self.input(id, MERIT_ORDER_SETTING)?;
        match setting.scenario_value() {
            Some(v) if v == 1.0 => Ok(true),
            Some(v) if v == 0.0 => Ok(false),
            other => Err(EngineError::Decode(format!(
                "invalid setting '{MERIT_ORDER_SETTING}': {other:?}"
            ))),
        }
    }

    pub fn order(&self, id: ScenarioId, kind: OrderKind) -> Result<Vec<String>, EngineError> {
        let body: OrderBody = self.get_json(&order_path(id, kind), &[])?;
        Ok(body.order)
    }

    /// Replace an order. Every item must already be part of the current order.
    pub fn set_order(&self, id: ScenarioId, kind: OrderKind, order: &[String]) -> Result<(), EngineError> {
        let current = self.order(id, kind)?;
        if let Some(item) = order.iter().find(|item| !current.contains(item)) {
            return Err(EngineError::InvalidOrder {
                order: kind.label(),
                item: item.clone(),
            });
        }

        let body = OrderBody {
            order: order.to_vec(),
        };
        let _: Value = self.put_json(&order_path(id, kind), &body)?;
        Ok(())
    }

    /// Evaluate graph queries against a scenario.
    pub fn gquery_results<S: AsRef<str>>(
        &self,
        id: ScenarioId,
        gqueries: &[S],
    ) -> Result<BTreeMap<String, GqueryResult>, EngineError> {
        let keys: Vec<&str> = gqueries.iter().map(|q| q.as_ref()).collect();
        let response: GqueryResponse = self.put_json(&scenario_path(id), &json!({ "gqueries": keys }))?;

        if let Some(missing) = keys.iter().find(|k| !response.gqueries.contains_key(**k)) {
            return Err(EngineError::Decode(format!("no result for gquery '{missing}'")));
        }
        Ok(response.gqueries)
    }
}

fn order_path(id: ScenarioId, kind: OrderKind) -> String {
    format!("{}/{}", scenario_path(id), kind.endpoint())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_fall_back_to_defaults() {
        let raw = r#"{
            "capacity_of_wind": {"min": 0, "max": 100, "default": 12.5, "unit": "MW", "disabled": false},
            "share_of_ev": {"min": 0, "max": 1, "default": 0.1, "user": 0.4, "share_group": "cars"},
            "settings_enable_merit_order": {"default": true, "disabled": null}
        }"#;
        let inputs: BTreeMap<String, InputParameter> = serde_json::from_str(raw).unwrap();

        assert_eq!(inputs["capacity_of_wind"].user_value(), None);
        assert_eq!(inputs["capacity_of_wind"].scenario_value(), Some(12.5));
        assert_eq!(inputs["share_of_ev"].scenario_value(), Some(0.4));
        assert_eq!(inputs["share_of_ev"].share_group.as_deref(), Some("cars"));
        assert_eq!(inputs["settings_enable_merit_order"].scenario_value(), Some(1.0));
        assert!(!inputs["settings_enable_merit_order"].is_disabled());
    }

    #[test]
    fn gquery_values_are_numbers_or_curves() {
        let raw = r#"{"gqueries": {
            "dashboard_co2": {"unit": "MT", "present": 150.2, "future": 20.0},
            "price_curve": {"unit": "curve", "present": [1, 2], "future": [3.5, 4]}
        }}"#;
        let response: GqueryResponse = serde_json::from_str(raw).unwrap();

        let co2 = &response.gqueries["dashboard_co2"];
        assert!(!co2.is_curve());
        assert_eq!(co2.future, Some(GqueryValue::Number(20.0)));

        let curve = &response.gqueries["price_curve"];
        assert!(curve.is_curve());
        assert_eq!(curve.future, Some(GqueryValue::Curve(vec![3.5, 4.0])));
    }
}
