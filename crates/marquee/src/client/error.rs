//! Client error types.

use thiserror::Error;

use crate::api::ProblemDetails;
use crate::store::StorageError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by calls to the catalog service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service could not be reached.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The access credential was rejected; recoverable through a refresh.
    #[error("authorization expired")]
    AuthorizationExpired,

    /// No usable credential remains; the session has been signed out.
    #[error("authorization invalid: {0}")]
    AuthorizationInvalid(String),

    /// The request was rejected as malformed.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The referenced item is unknown to the service.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service failed to handle the request.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Credentials could not be persisted.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Coarse classification of [`ApiError`] for views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkUnavailable,
    AuthorizationExpired,
    AuthorizationInvalid,
    ValidationFailed,
    NotFound,
    Server,
    Decode,
    Storage,
}

impl ApiError {
    /// Map a non-success status and its body to an error.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<ProblemDetails>(body)
            .ok()
            .and_then(|p| p.message())
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status {
            401 => ApiError::AuthorizationExpired,
            403 => ApiError::AuthorizationInvalid(message),
            404 => ApiError::NotFound(message),
            400 | 409 | 422 => ApiError::ValidationFailed(message),
            _ => ApiError::Server { status, message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            ApiError::AuthorizationExpired => ErrorKind::AuthorizationExpired,
            ApiError::AuthorizationInvalid(_) => ErrorKind::AuthorizationInvalid,
            ApiError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether a view should show this error. Expired authorization is
    /// absorbed by the gateway and never reaches a view.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ApiError::AuthorizationExpired)
    }

    /// Whether the error ends the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthorizationInvalid(_))
    }

    /// Short message suitable for a dismissible banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NetworkUnavailable(_) => {
                "Could not reach the server. Please check your network connection.".to_string()
            }
            ApiError::AuthorizationExpired | ApiError::AuthorizationInvalid(_) => {
                "Your session has ended. Please sign in again.".to_string()
            }
            ApiError::ValidationFailed(message) => message.clone(),
            ApiError::NotFound(_) => "That item could not be found.".to_string(),
            ApiError::Server { .. } | ApiError::Decode(_) | ApiError::Storage(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::NetworkUnavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_taxonomy() {
        assert!(matches!(
            ApiError::from_status(401, b""),
            ApiError::AuthorizationExpired
        ));
        assert!(matches!(
            ApiError::from_status(404, b"{}"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(400, br#"{"rating": ["out of range"]}"#),
            ApiError::ValidationFailed(msg) if msg == "rating: out of range"
        ));
        assert!(matches!(
            ApiError::from_status(503, b"down"),
            ApiError::Server { status: 503, message } if message == "HTTP 503"
        ));
    }

    #[test]
    fn only_invalid_authorization_ends_the_session() {
        assert!(ApiError::AuthorizationInvalid("x".into()).is_auth_failure());
        assert!(!ApiError::AuthorizationExpired.is_auth_failure());
        assert!(!ApiError::NetworkUnavailable("x".into()).is_auth_failure());
    }
}
