//! Error types for the swarm client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the orchestrator
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}, code {code:?}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error category reported by the orchestrator, e.g. `not-authorized`
        code: Option<String>,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl ClientError {
    /// Build an API error from a status code and raw response body
    ///
    /// Structured `{ "error": { "code", "message" } }` bodies are unpacked;
    /// anything else is kept verbatim as the message.
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self::ApiError {
                status,
                code: Some(envelope.error.code),
                message: envelope.error.message,
            },
            Err(_) => Self::ApiError {
                status,
                code: None,
                message: body.to_string(),
            },
        }
    }

    fn code(&self) -> Option<&str> {
        match self {
            Self::ApiError { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The orchestrator rejected the client's identity or run token
    pub fn is_not_authorized(&self) -> bool {
        self.code() == Some("not-authorized")
    }

    /// A required identifying parameter was absent
    pub fn is_missing_input(&self) -> bool {
        self.code() == Some("missing-input")
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}
