use crate::payload::FieldErrors;
use serde_json::Value;
use thiserror::Error;

/// Main error type for FINA API operations
#[derive(Debug, Error)]
pub enum FinaError {
    /// Missing or invalid client configuration (base URL, login, password)
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error. `status` is 0 when no response was received.
    #[error("HTTP error {status}: {body}")]
    Http {
        status: u16,
        body: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The remote service answered with a non-null `ex` field, or
    /// authentication succeeded at HTTP level without returning a token
    #[error("{message}")]
    Remote { ex: Value, message: String },

    /// Payload rejected before it was sent
    #[error("payload validation failed: {errors}")]
    Validation { errors: FieldErrors },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl FinaError {
    /// Create a new HTTP error
    pub fn http(
        status: u16,
        body: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        FinaError::Http {
            status,
            body: body.into(),
            source,
        }
    }

    /// Create a new remote error carrying the raw `ex` value
    pub fn remote(ex: Value, message: impl Into<String>) -> Self {
        FinaError::Remote {
            ex,
            message: message.into(),
        }
    }

    /// Get the HTTP status code if this is a transport error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FinaError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the raw response body if this is a transport error
    pub fn body(&self) -> Option<&str> {
        match self {
            FinaError::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Get the remote `ex` value if this is a remote error
    pub fn ex(&self) -> Option<&Value> {
        match self {
            FinaError::Remote { ex, .. } => Some(ex),
            _ => None,
        }
    }

    /// Check if this error is an HTTP 401
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FinaError::Http { status: 401, .. })
    }

    /// Check if this is a business rejection reported by the remote service
    pub fn is_remote(&self) -> bool {
        matches!(self, FinaError::Remote { .. })
    }

    /// Check if the request was rejected locally before being sent
    pub fn is_validation(&self) -> bool {
        matches!(self, FinaError::Validation { .. })
    }
}

/// Result type for FINA operations
pub type Result<T> = std::result::Result<T, FinaError>;
