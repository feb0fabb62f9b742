//! Unified engine error model and mapping helpers.
//! The authorizer keeps two channels deliberately separate: absolute policy
//! violations and configuration faults are raised through this enum, while
//! ordinary data-dependent denials travel back as an accumulated
//! `ViolationReport` and never as an error.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineError {
    /// Malformed or incomplete input from the caller (400).
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    /// Absolute policy refusal that no role may override (403).
    #[error("{code}: {message}")]
    Forbidden { code: String, message: String },
    /// A referenced object could not be resolved at all (404).
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    /// Engine-side fault, e.g. an inconsistency in static configuration (500).
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl EngineError {
    pub fn code_str(&self) -> &str {
        match self {
            EngineError::UserInput { code, .. }
            | EngineError::Forbidden { code, .. }
            | EngineError::NotFound { code, .. }
            | EngineError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            EngineError::UserInput { message, .. }
            | EngineError::Forbidden { message, .. }
            | EngineError::NotFound { message, .. }
            | EngineError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { EngineError::UserInput { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { EngineError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { EngineError::NotFound { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { EngineError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            EngineError::UserInput { .. } => 400,
            EngineError::Forbidden { .. } => 403,
            EngineError::NotFound { .. } => 404,
            EngineError::Internal { .. } => 500,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
