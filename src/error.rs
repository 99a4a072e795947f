//! Failure shapes reported by the external collaborators.
//!
//! Every service the orchestrator talks to (container engine, administration
//! service) fails in one of two ways: with a structured error carrying a status
//! code, a name and a message, or with something that does not match that shape.
//! Callers need to tell the two apart so structured details reach the operator
//! verbatim.

use serde::{Deserialize, Serialize};

/// Structured failure reported by an external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{name}: {message}")]
pub struct ServiceError {
    /// Status code reported by the service (HTTP-style)
    pub status_code: u16,
    /// Short error name, e.g. "Bad Request"
    pub name: String,
    /// Service-provided message
    pub message: String,
}

impl ServiceError {
    pub fn new(status_code: u16, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single request against an external service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The service answered with a structured error
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Anything else: transport failures, undecodable responses, ...
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RequestError {
    pub fn unknown(message: impl std::fmt::Display) -> Self {
        Self::Unknown(message.to_string())
    }

    /// Status code of a structured failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service(e) => Some(e.status_code),
            Self::Unknown(_) => None,
        }
    }
}
