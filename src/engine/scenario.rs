//! Scenario lifecycle and header operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::domain::ScenarioId;
use crate::engine::session::EngineSession;
use crate::error::EngineError;

/// Scenario header as returned by `GET scenarios/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioHeader {
    pub id: ScenarioId,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub start_year: Option<u32>,
    #[serde(default)]
    pub end_year: Option<u32>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub keep_compatible: Option<bool>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub template: Option<u64>,
    #[serde(default)]
    pub esdl_exportable: Option<bool>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Settings for a new scenario; unset options keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewScenario {
    pub area_code: String,
    pub end_year: u32,
    pub metadata: Option<Map<String, Value>>,
    pub keep_compatible: Option<bool>,
    pub private: Option<bool>,
}

impl EngineSession {
    pub fn scenario_header(&self, id: ScenarioId) -> Result<ScenarioHeader, EngineError> {
        self.get_json(&scenario_path(id), &[])
    }

    /// Scenarios owned by the account behind the access token.
    pub fn my_scenarios(&self) -> Result<Vec<ScenarioHeader>, EngineError> {
        self.get_pages("scenarios")
    }

    /// Create a scenario and apply the optional settings afterwards.
    pub fn create_scenario(&self, new: &NewScenario) -> Result<ScenarioHeader, EngineError> {
        let body = json!({
            "scenario": { "area_code": new.area_code, "end_year": new.end_year }
        });
        let header: ScenarioHeader = self.post_json("scenarios", &body)?;
        info!(scenario = %header.id, area = %new.area_code, end_year = new.end_year, "created scenario");

        self.apply_settings(header.id, new.metadata.as_ref(), new.keep_compatible, new.private)
            .map(|updated| updated.unwrap_or(header))
    }

    /// Copy a scenario. Without overrides the copy inherits the source settings.
    pub fn copy_scenario(
        &self,
        source: ScenarioId,
        metadata: Option<&Map<String, Value>>,
        keep_compatible: Option<bool>,
        private: Option<bool>,
    ) -> Result<ScenarioHeader, EngineError> {
        let body = json!({ "scenario": { "scenario_id": source.to_string() } });
        let header: ScenarioHeader = self.post_json("scenarios", &body)?;
        info!(source = %source, scenario = %header.id, "copied scenario");

        self.apply_settings(header.id, metadata, keep_compatible, private)
            .map(|updated| updated.unwrap_or(header))
    }

    /// Interpolate a 2050 scenario to `end_year`; returns the new scenario.
    pub fn interpolate_scenario(&self, id: ScenarioId, end_year: u32) -> Result<ScenarioHeader, EngineError> {
        let header = self.scenario_header(id)?;
        if header.end_year != Some(2050) {
            return Err(EngineError::Invalid(format!(
                "can only interpolate 2050 scenarios, scenario {id} ends in {}",
                header
                    .end_year
                    .map_or_else(|| "an unknown year".to_string(), |y| y.to_string())
            )));
        }

        let path = format!("{}/interpolate", scenario_path(id));
        self.post_json(&path, &json!({ "end_year": end_year }))
    }

    /// Reset user values, heat network order and forecast storage order.
    pub fn reset_scenario(&self, id: ScenarioId) -> Result<(), EngineError> {
        let _: Value = self.put_json(&scenario_path(id), &json!({ "reset": true }))?;
        Ok(())
    }

    pub fn delete_scenario(&self, id: ScenarioId) -> Result<(), EngineError> {
        self.delete(&scenario_path(id))?;
        info!(scenario = %id, "deleted scenario");
        Ok(())
    }

    /// Update header fields (`metadata`, `private`, `keep_compatible`, ...).
    pub fn update_header(&self, id: ScenarioId, fields: Map<String, Value>) -> Result<(), EngineError> {
        let _: Value = self.put_json(&scenario_path(id), &json!({ "scenario": fields }))?;
        Ok(())
    }

    /// Replace the scenario metadata.
    pub fn set_metadata(&self, id: ScenarioId, metadata: Map<String, Value>) -> Result<(), EngineError> {
        let mut fields = Map::new();
        fields.insert("metadata".to_string(), Value::Object(metadata));
        self.update_header(id, fields)
    }

    /// Merge entries into the existing metadata.
    pub fn add_metadata(&self, id: ScenarioId, entries: Map<String, Value>) -> Result<(), EngineError> {
        let mut metadata = self.scenario_header(id)?.metadata;
        metadata.extend(entries);
        self.set_metadata(id, metadata)
    }

    /// GUI URL of a scenario; `load` opens it directly in the model.
    pub fn gui_url(&self, id: ScenarioId, load: bool) -> Result<String, EngineError> {
        let base = self.config().etm_url()?;
        Ok(if load {
            format!("{base}scenarios/{id}/load")
        } else {
            format!("{base}scenarios/{id}")
        })
    }

    fn apply_settings(
        &self,
        id: ScenarioId,
        metadata: Option<&Map<String, Value>>,
        keep_compatible: Option<bool>,
        private: Option<bool>,
    ) -> Result<Option<ScenarioHeader>, EngineError> {
        let mut fields = Map::new();
        if let Some(metadata) = metadata {
            fields.insert("metadata".to_string(), Value::Object(metadata.clone()));
        }
        if let Some(flag) = keep_compatible {
            fields.insert("keep_compatible".to_string(), Value::Bool(flag));
        }
        if let Some(flag) = private {
            fields.insert("private".to_string(), Value::Bool(flag));
        }
        if fields.is_empty() {
            return Ok(None);
        }

        self.update_header(id, fields)?;
        self.scenario_header(id).map(Some)
    }
}

pub(crate) fn scenario_path(id: ScenarioId) -> String {
    format!("scenarios/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parses_engine_json() {
        let raw = r#"{
            "id": 12345,
            "area_code": "nl2019",
            "start_year": 2019,
            "end_year": 2050,
            "private": false,
            "keep_compatible": true,
            "source": "ETM",
            "template": null,
            "metadata": {"title": "demo"},
            "created_at": "2024-03-01T10:15:00.000Z",
            "updated_at": null,
            "url": "https://engine.energytransitionmodel.com/api/v3/scenarios/12345"
        }"#;
        let header: ScenarioHeader = serde_json::from_str(raw).unwrap();

        assert_eq!(header.id, ScenarioId(12345));
        assert_eq!(header.area_code.as_deref(), Some("nl2019"));
        assert_eq!(header.end_year, Some(2050));
        assert_eq!(header.metadata["title"], "demo");
        assert_eq!(header.created_at.unwrap().to_rfc3339(), "2024-03-01T10:15:00+00:00");
        assert!(header.updated_at.is_none());
    }

    #[test]
    fn gui_url_uses_public_model_for_default_engine() {
        let session = EngineSession::new(Default::default()).unwrap();
        assert_eq!(
            session.gui_url(ScenarioId(7), false).unwrap(),
            "https://energytransitionmodel.com/scenarios/7"
        );
        assert_eq!(
            session.gui_url(ScenarioId(7), true).unwrap(),
            "https://energytransitionmodel.com/scenarios/7/load"
        );
    }
}
