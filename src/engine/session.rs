//! Blocking HTTP session with the ETM engine.
//!
//! The session owns the `reqwest` client and the connection settings. It
//! knows nothing about scenarios; the endpoint modules build paths and pass
//! the scenario id explicitly.

use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::{EngineConfig, with_trailing_slash};
use crate::error::EngineError;

const GROUP_BALANCE_MARKER: &str = "group does not balance";
/// Page size for listing endpoints.
const PAGE_LIMIT: usize = 25;

/// One page of a listing endpoint (`scenarios`, `saved_scenarios`).
#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    total_pages: Option<u64>,
}

pub struct EngineSession {
    client: Client,
    base_url: String,
    config: EngineConfig,
}

impl EngineSession {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("etm-client/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| EngineError::Config("access token contains invalid characters".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(&config.engine_url),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Absolute URL for a path relative to the engine base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, EngineError> {
        let url = self.url(path);
        let resp = self.send(self.client.get(&url).query(query), "GET", &url)?;
        decode_json(resp)
    }

    /// Every item of a paginated listing, following pages until the last one.
    pub fn get_pages<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, EngineError> {
        let limit = PAGE_LIMIT.to_string();
        let mut items = Vec::new();

        for page in 1u64.. {
            let number = page.to_string();
            let body: Page<T> = self.get_json(path, &[("page", number.as_str()), ("limit", limit.as_str())])?;
            let received = body.data.len();
            items.extend(body.data);

            let last = match body.meta.total_pages {
                Some(total) => page >= total,
                None => received < PAGE_LIMIT,
            };
            if last || received == 0 {
                break;
            }
        }

        debug!(path, items = items.len(), "fetched listing");
        Ok(items)
    }

    /// GET a text body (CSV endpoints).
    pub fn get_text(&self, path: &str) -> Result<String, EngineError> {
        let url = self.url(path);
        let resp = self.send(self.client.get(&url), "GET", &url)?;
        resp.text().map_err(|e| EngineError::Decode(e.to_string()))
    }

    pub fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, EngineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self.send(self.client.post(&url).json(body), "POST", &url)?;
        decode_json(resp)
    }

    pub fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, EngineError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self.send(self.client.put(&url).json(body), "PUT", &url)?;
        decode_json(resp)
    }

    pub fn delete(&self, path: &str) -> Result<(), EngineError> {
        let url = self.url(path);
        self.send(self.client.delete(&url), "DELETE", &url)?;
        Ok(())
    }

    /// Upload a single-column curve as a multipart `file` field.
    pub fn upload(&self, path: &str, filename: &str, values: &[f64]) -> Result<Value, EngineError> {
        let body = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        let part = multipart::Part::text(body)
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = multipart::Form::new().part("file", part);

        let url = self.url(path);
        let resp = self.send(self.client.put(&url).multipart(form), "PUT", &url)?;
        decode_json(resp)
    }

    fn send(&self, request: RequestBuilder, method: &str, url: &str) -> Result<Response, EngineError> {
        debug!(method, url, "engine request");
        let resp = request.send()?;
        let status = resp.status();

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().map_err(|e| EngineError::Decode(e.to_string()))?;
            return Err(EngineError::Unprocessable(api_errors(&body)));
        }
        if !status.is_success() {
            return Err(EngineError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp)
    }
}

fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, EngineError> {
    let body = resp.text().map_err(|e| EngineError::Decode(e.to_string()))?;
    // Some endpoints answer with an empty body (e.g. 204 on delete-like PUTs).
    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    serde_json::from_str(body).map_err(|e| EngineError::Decode(e.to_string()))
}

/// Extract messages from a 422 body (`{"errors": [...]}`).
fn api_errors(body: &str) -> Vec<String> {
    let parsed: Option<Vec<String>> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("errors").cloned())
        .and_then(|v| serde_json::from_value(v).ok());

    match parsed {
        Some(errors) => errors
            .into_iter()
            .map(|e| {
                if e.contains(GROUP_BALANCE_MARKER) {
                    format_share_group_error(&e)
                } else {
                    e
                }
            })
            .collect(),
        None => vec![body.trim().to_string()],
    }
}

/// Reformat an engine share-group message into a readable block.
///
/// `"heating" group does not balance: group sums to 101.0 using a=60.0 b=41.0`
/// becomes
///
/// ```text
/// Share_group 'heating' sums to 101.0
///    {'a': 60.0,
///     'b': 41.0}
/// ```
pub fn format_share_group_error(error: &str) -> String {
    let group = error.split('"').nth(1).unwrap_or_default();

    let tokens: Vec<&str> = error
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|t| t.trim_matches(|c: char| matches!(c, ':' | ';' | '(' | ')' | '{' | '}')))
        .filter(|t| !t.is_empty())
        .collect();

    let sum = tokens
        .iter()
        .find(|t| !t.contains('=') && t.contains('.') && t.parse::<f64>().is_ok())
        .copied()
        .unwrap_or_default();

    let items: Vec<String> = tokens
        .iter()
        .filter_map(|t| t.split_once('='))
        .filter(|(k, v)| {
            !k.is_empty()
                && k.chars().all(|c| c.is_ascii_lowercase() || c == '_')
                && v.parse::<f64>().is_ok()
        })
        .map(|(k, v)| format!("{k}': {v}"))
        .collect();

    format!(
        "Share_group '{group}' sums to {sum}\n   {{'{}}}",
        items.join(",\n    '")
    )
}
