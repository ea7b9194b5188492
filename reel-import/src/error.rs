//! Error types for reel-import
//!
//! `ClientError` covers every external collaborator (sink, enricher, list sources,
//! title guesser, notification webhooks). `ImportError` covers failures that abort
//! a whole list.

use crate::rules::RuleError;
use thiserror::Error;

/// HTTP collaborator errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The service refused the request (validation failure)
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A local helper executable failed to run or exited unsuccessfully
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// List-level failures
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Unknown list: {0}")]
    UnknownList(String),

    #[error("No source registered for list type {0:?}")]
    UnknownSource(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ClientError::Api {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "API error 503: busy");

        let err = ImportError::UnknownSource("imdb".to_string());
        assert_eq!(err.to_string(), "No source registered for list type \"imdb\"");
    }

    #[test]
    fn test_rule_error_converts() {
        let rule_err = RuleError::Eval("boom".to_string());
        let err: ImportError = rule_err.into();
        assert!(matches!(err, ImportError::InvalidRule(_)));
    }
}
