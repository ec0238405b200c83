use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("failed to parse policy: {0}")]
    ParseError(String),

    #[error("evaluation error: {0}")]
    EvalError(String),

    #[error("scope error: {0}")]
    ScopeError(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

impl PolicyError {
    /// The message carried by the error, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            PolicyError::ParseError(msg)
            | PolicyError::EvalError(msg)
            | PolicyError::ScopeError(msg)
            | PolicyError::EntityError(msg)
            | PolicyError::InvalidFormat(msg) => msg,
        }
    }
}

impl From<std::io::Error> for PolicyError {
    fn from(err: std::io::Error) -> Self {
        PolicyError::InvalidFormat(err.to_string())
    }
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::EntityError(err.to_string())
    }
}
