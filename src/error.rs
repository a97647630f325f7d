use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors. Anything recoverable during a walk is reported as a
/// [`crate::Diagnostic`] instead.
#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LeastError {
    #[error("root path not found: {0}")]
    RootNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("schema fetch failed: {0}")]
    FetchError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("no supported IaC files found in {0}")]
    NoProviderDetected(String),

    #[error("no IAM policies found in {0}")]
    NoPoliciesFound(String),

    #[error("Poisoned lock error: {0}")]
    PoisonedLockError(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<std::io::Error> for LeastError {
    fn from(err: std::io::Error) -> Self {
        LeastError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LeastError {
    fn from(err: serde_json::Error) -> Self {
        LeastError::JsonError(err.to_string())
    }
}

impl From<hcl::Error> for LeastError {
    fn from(err: hcl::Error) -> Self {
        LeastError::ParseError(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LeastError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        LeastError::PoisonedLockError(err.to_string())
    }
}

impl From<config::ConfigError> for LeastError {
    fn from(err: config::ConfigError) -> Self {
        LeastError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let err: LeastError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, LeastError::Io(ref msg) if msg.contains("gone")));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: LeastError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, LeastError::JsonError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LeastError::RootNotFound("/nope".to_string());
        assert_eq!(err.to_string(), "root path not found: /nope");
    }
}
