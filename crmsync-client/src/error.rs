//! Error taxonomy for backend requests.
//!
//! Errors are `Clone` because the query cache keeps the last failure of a
//! key next to its last good data.

use crmsync_types::ValidationErrors;
use serde_json::Value;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never reached the server.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// 422-class response with field-level messages.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// 401 response. The adapter has already cleared the credential.
    #[error("authentication required")]
    Unauthorized,

    #[error("permission denied")]
    Forbidden { body: Option<Value> },

    #[error("not found: {path}")]
    NotFound { path: String },

    /// Any other non-2xx response.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Option<Value> },

    /// A required identifier was empty; no request was issued.
    #[error("missing required identifier: {0}")]
    MissingIdentifier(&'static str),

    /// The response arrived after its query was cancelled or invalidated.
    #[error("request cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Builds the error for a non-2xx response.
    pub fn from_status(status: u16, path: &str, body: Value) -> Self {
        let body = (!body.is_null()).then_some(body);
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden { body },
            404 => ApiError::NotFound {
                path: path.to_string(),
            },
            422 => ApiError::Validation(
                body.as_ref()
                    .map(ValidationErrors::from_body)
                    .unwrap_or_default(),
            ),
            _ => ApiError::Status { status, body },
        }
    }

    /// Returns true for transient failures worth retrying on reads.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) | ApiError::Timeout => true,
            ApiError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    /// Field-level messages, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation(_) => Some(422),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to a user. Unknown failures collapse to
    /// a generic sentence.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(errors) => errors.to_string(),
            ApiError::Network(_) | ApiError::Timeout => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            ApiError::Forbidden { .. } => "You do not have permission to do that.".to_string(),
            ApiError::NotFound { .. } => "The requested item could not be found.".to_string(),
            ApiError::MissingIdentifier(_) => "Something is missing. Please reload and try again.".to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Serialization(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization(e.to_string())
    }
}
