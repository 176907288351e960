//! Engine connection settings.
//!
//! Settings come from the environment (a `.env` file is honoured) and can be
//! overridden from the command line:
//!
//! | variable            | meaning                                   |
//! |---------------------|-------------------------------------------|
//! | `ETM_ENGINE_URL`    | engine API base URL                       |
//! | `ETM_URL`           | model GUI base URL                        |
//! | `ETM_MYC_URL`       | multi-year-chart base URL                 |
//! | `ETM_ACCESS_TOKEN`  | personal access token (bearer)            |
//! | `ETM_TIMEOUT_SECS`  | request timeout in seconds                |

use std::time::Duration;

use crate::error::EngineError;

pub const DEFAULT_ENGINE_URL: &str = "https://engine.energytransitionmodel.com/api/v3/";
pub const DEFAULT_ETM_URL: &str = "https://energytransitionmodel.com/";
pub const DEFAULT_MYC_URL: &str = "https://myc.energytransitionmodel.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub engine_url: String,
    /// GUI URL; only implied for the default engine.
    pub etm_url: Option<String>,
    /// Multi-year-chart URL; only implied for the default engine.
    pub myc_url: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            etm_url: None,
            myc_url: None,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Read settings from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (used by `from_env`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match get("ETM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| EngineError::Config(format!("ETM_TIMEOUT_SECS must be whole seconds, got '{raw}'")))?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            engine_url: get("ETM_ENGINE_URL").unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string()),
            etm_url: get("ETM_URL"),
            myc_url: get("ETM_MYC_URL"),
            token: get("ETM_ACCESS_TOKEN"),
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, engine_url: Option<String>, token: Option<String>) -> Result<Self, EngineError> {
        if let Some(url) = engine_url {
            self.engine_url = url;
        }
        if token.is_some() {
            self.token = token;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn connected_to_default_engine(&self) -> bool {
        with_trailing_slash(&self.engine_url) == DEFAULT_ENGINE_URL
    }

    /// GUI URL, falling back to the public model for the default engine.
    pub fn etm_url(&self) -> Result<String, EngineError> {
        resolve(&self.etm_url, self.connected_to_default_engine(), DEFAULT_ETM_URL, "ETM_URL")
    }

    /// MYC URL, falling back to the public charts for the default engine.
    pub fn myc_url(&self) -> Result<String, EngineError> {
        resolve(&self.myc_url, self.connected_to_default_engine(), DEFAULT_MYC_URL, "ETM_MYC_URL")
    }

    fn validate(&self) -> Result<(), EngineError> {
        let url = self.engine_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(EngineError::Config(format!("engine URL must be http(s), got '{url}'")));
        }
        Ok(())
    }
}

fn resolve(explicit: &Option<String>, default_engine: bool, fallback: &str, var: &str) -> Result<String, EngineError> {
    match explicit {
        Some(url) => Ok(with_trailing_slash(url)),
        None if default_engine => Ok(fallback.to_string()),
        None => Err(EngineError::Config(format!(
            "{var} must be set when connecting to a custom engine"
        ))),
    }
}

pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
