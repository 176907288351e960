//! Error types.
//!
//! Library code returns typed errors (`TransformError` for the curve
//! transforms, `EngineError` for the remote engine). The `etm` binary folds
//! everything into `AppError`, which carries the process exit code:
//!
//! - `2`: input, file or configuration error
//! - `3`: data validation error
//! - `4`: remote engine error

use thiserror::Error;

/// Errors raised by the pure curve transforms and table constructors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("Shape mismatch: {0}")]
    Shape(String),
    #[error("Missing key(s) in regionalisation: {}", quoted(.0))]
    MissingKeys(Vec<String>),
    #[error("Unused key(s) in {table}: {}", quoted(.keys))]
    UnusedKeys { table: &'static str, keys: Vec<String> },
    #[error("Missing key(s) in mapping: {}", quoted(.0))]
    UnmappedKeys(Vec<String>),
    #[error("Unknown mapping column '{0}'")]
    UnknownLabelColumn(String),
    #[error("Unknown node '{0}' in regionalisation")]
    UnknownNode(String),
    #[error("Unknown curve column(s): {}", quoted(.0))]
    UnknownColumn(Vec<String>),
    #[error("Row position {position} out of range for {len} rows")]
    RowOutOfRange { position: usize, len: usize },
    #[error("Duplicate {what} label '{label}'")]
    DuplicateLabel { what: &'static str, label: String },
    #[error("Non-finite value in {what} '{label}'")]
    NonFinite { what: &'static str, label: String },
    #[error("Deficits in hourly carrier curves ({rows} unbalanced rows)")]
    Unbalanced { rows: usize },
    #[error("Regionalisation key(s) do not sum to 1: {0}")]
    FractionSums(String),
}

/// Errors raised while talking to the ETM engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Engine request to '{url}' failed with status {status}")]
    Status { url: String, status: reqwest::StatusCode },
    #[error("ETEngine returned the following error(s):\n > {}", .0.join("\n > "))]
    Unprocessable(Vec<String>),
    #[error("Failed to decode engine response: {0}")]
    Decode(String),
    #[error("Merit order disabled for scenario {0}")]
    MeritOrderDisabled(u64),
    #[error("Invalid {order} item: '{item}'")]
    InvalidOrder { order: &'static str, item: String },
    #[error("Invalid engine configuration: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
}

fn quoted(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        AppError::new(3, err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::Config(_) | EngineError::Invalid(_) => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_keys_message_lists_every_key() {
        let err = TransformError::UnmappedKeys(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Missing key(s) in mapping: 'a', 'b'");
    }

    #[test]
    fn unprocessable_joins_engine_messages() {
        let err = EngineError::Unprocessable(vec!["first".into(), "second".into()]);
        assert_eq!(
            err.to_string(),
            "ETEngine returned the following error(s):\n > first\n > second"
        );
    }

    #[test]
    fn exit_codes_follow_error_origin() {
        let transform: AppError = TransformError::UnknownNode("x".into()).into();
        assert_eq!(transform.exit_code(), 3);

        let config: AppError = EngineError::Config("bad url".into()).into();
        assert_eq!(config.exit_code(), 2);

        let engine: AppError = EngineError::MeritOrderDisabled(1).into();
        assert_eq!(engine.exit_code(), 4);
    }
}
