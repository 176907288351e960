//! Custom curves attached to a scenario.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::ScenarioId;
use crate::engine::scenario::scenario_path;
use crate::engine::session::EngineSession;
use crate::error::EngineError;

/// Number of hourly values a custom curve must carry.
pub const CURVE_LENGTH: usize = 8760;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomCurve {
    pub key: String,
    #[serde(default)]
    pub attached: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Input keys whose user values the curve overrides.
    #[serde(default)]
    pub overrides: Vec<String>,
}

impl EngineSession {
    /// Custom curves of a scenario, sorted by key.
    pub fn custom_curves(
        &self,
        id: ScenarioId,
        include_unattached: bool,
        include_internal: bool,
    ) -> Result<Vec<CustomCurve>, EngineError> {
        let mut query = Vec::new();
        if include_unattached {
            query.push(("include_unattached", "true"));
        }
        if include_internal {
            query.push(("include_internal", "true"));
        }

        let mut curves: Vec<CustomCurve> = self.get_json(&custom_curves_path(id), &query)?;
        curves.retain(|c| include_unattached || c.attached);
        curves.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(curves)
    }

    /// Download one attached custom curve.
    pub fn custom_curve(&self, id: ScenarioId, key: &str) -> Result<Vec<f64>, EngineError> {
        let attached = self.custom_curves(id, false, true)?;
        if !attached.iter().any(|c| c.key == key) {
            return Err(EngineError::Invalid(format!("custom curve '{key}' is not attached")));
        }

        let body = self.get_text(&format!("{}/{key}", custom_curves_path(id)))?;
        parse_curve_body(key, &body)
    }

    /// Upload values for a custom curve key.
    pub fn upload_custom_curve(
        &self,
        id: ScenarioId,
        key: &str,
        values: &[f64],
        filename: Option<&str>,
    ) -> Result<CustomCurve, EngineError> {
        self.validate_custom_curve_key(id, key)?;
        if values.len() != CURVE_LENGTH {
            return Err(EngineError::Invalid(format!(
                "custom curve '{key}' must contain {CURVE_LENGTH} entries, got {}",
                values.len()
            )));
        }

        let response = self.upload(
            &format!("{}/{key}", custom_curves_path(id)),
            filename.unwrap_or(key),
            values,
        )?;
        info!(scenario = %id, key, "uploaded custom curve");

        serde_json::from_value(response).map_err(|e| EngineError::Decode(e.to_string()))
    }

    /// Detach a custom curve. Returns `false` when it was not attached.
    pub fn delete_custom_curve(&self, id: ScenarioId, key: &str) -> Result<bool, EngineError> {
        self.validate_custom_curve_key(id, key)?;

        let attached = self.custom_curves(id, false, true)?;
        if !attached.iter().any(|c| c.key == key) {
            info!(scenario = %id, key, "custom curve already unattached");
            return Ok(false);
        }

        self.delete(&format!("{}/{key}", custom_curves_path(id)))?;
        info!(scenario = %id, key, "deleted custom curve");
        Ok(true)
    }

    fn validate_custom_curve_key(&self, id: ScenarioId, key: &str) -> Result<(), EngineError> {
        let known = self.custom_curves(id, true, true)?;
        if known.iter().any(|c| c.key == key) {
            Ok(())
        } else {
            Err(EngineError::Invalid(format!("'{key}' is not a valid custom curve key")))
        }
    }
}

fn custom_curves_path(id: ScenarioId) -> String {
    format!("{}/custom_curves", scenario_path(id))
}

/// Parse a header-less single-column curve body.
fn parse_curve_body(key: &str, body: &str) -> Result<Vec<f64>, EngineError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| {
            line.parse::<f64>().map_err(|_| {
                EngineError::Decode(format!("custom curve '{key}' line {}: '{line}' is not a number", i + 1))
            })
        })
        .collect()
}
