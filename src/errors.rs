use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::state::ConfigError;
use crate::utils::status_vocabulary::VocabularyError;

/// Main error type for the ride-reconciler service.
///
/// The classifiers themselves never produce one of these; errors only come
/// from talking to the backend, loading configuration or serving HTTP.
#[derive(Debug)]
pub enum RideError {
    // HTTP and API errors
    BadRequest(String),
    Unauthorized(String),
    InternalServer(String),

    // Backend errors
    BackendStatus { status: u16, message: String },

    // Network and HTTP client errors
    NetworkTimeout,
    NetworkConnection(String),
    HttpClient(String),
    InvalidUrl(String),

    // Serialization and parsing errors
    JsonParsing(String),
    JsonSerialization(String),

    // Configuration and setup errors
    ConfigurationError(String),
    InvalidConfiguration(String),
    Vocabulary(VocabularyError),

    // Security and authentication errors
    TokenMissing,
    TokenExpired,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl fmt::Display for RideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            RideError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            RideError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),

            RideError::BackendStatus { status, message } => {
                write!(f, "Backend responded with {}: {}", status, message)
            }

            RideError::NetworkTimeout => write!(f, "Network request timed out"),
            RideError::NetworkConnection(msg) => write!(f, "Network connection error: {}", msg),
            RideError::HttpClient(msg) => write!(f, "HTTP client error: {}", msg),
            RideError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),

            RideError::JsonParsing(msg) => write!(f, "JSON parsing error: {}", msg),
            RideError::JsonSerialization(msg) => write!(f, "JSON serialization error: {}", msg),

            RideError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            RideError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            RideError::Vocabulary(err) => write!(f, "Status vocabulary error: {}", err),

            RideError::TokenMissing => write!(f, "Authentication token is missing"),
            RideError::TokenExpired => write!(f, "Authentication token has expired"),
        }
    }
}

impl std::error::Error for RideError {}

impl IntoResponse for RideError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            RideError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            RideError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),

            RideError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "token_missing",
                "Authorization bearer token is required".to_string(),
            ),
            RideError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Authentication token has expired".to_string(),
            ),

            RideError::BackendStatus { status, message } => (
                StatusCode::BAD_GATEWAY,
                "backend_error",
                format!("Backend responded with {}: {}", status, message),
            ),
            RideError::NetworkTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "backend_timeout",
                "Backend request timed out".to_string(),
            ),
            RideError::NetworkConnection(msg) => {
                (StatusCode::BAD_GATEWAY, "backend_unreachable", msg)
            }

            // All other errors are treated as internal server errors
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                other.to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type RideResult<T> = Result<T, RideError>;

impl From<reqwest::Error> for RideError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RideError::NetworkTimeout
        } else if err.is_connect() {
            RideError::NetworkConnection(err.to_string())
        } else if err.is_decode() {
            RideError::JsonParsing(err.to_string())
        } else {
            RideError::HttpClient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RideError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            RideError::JsonParsing(err.to_string())
        } else {
            RideError::JsonSerialization(err.to_string())
        }
    }
}

impl From<VocabularyError> for RideError {
    fn from(err: VocabularyError) -> Self {
        RideError::Vocabulary(err)
    }
}

impl From<ConfigError> for RideError {
    fn from(err: ConfigError) -> Self {
        RideError::InvalidConfiguration(err.to_string())
    }
}

impl From<std::io::Error> for RideError {
    fn from(err: std::io::Error) -> Self {
        RideError::ConfigurationError(err.to_string())
    }
}

// Helper functions for creating common errors
impl RideError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        RideError::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        RideError::Unauthorized(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        RideError::InternalServer(msg.into())
    }

    pub fn backend_status(status: u16, message: impl Into<String>) -> Self {
        RideError::BackendStatus {
            status,
            message: message.into(),
        }
    }

    /// Whether the error means the caller's session is no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RideError::Unauthorized(_) | RideError::TokenMissing | RideError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RideError::backend_status(503, "maintenance");
        assert_eq!(error.to_string(), "Backend responded with 503: maintenance");
    }

    #[test]
    fn test_helper_functions() {
        assert!(matches!(RideError::bad_request("test"), RideError::BadRequest(_)));
        assert!(matches!(RideError::unauthorized("test"), RideError::Unauthorized(_)));
        assert!(matches!(RideError::internal_error("test"), RideError::InternalServer(_)));
    }

    #[test]
    fn test_auth_failures() {
        assert!(RideError::TokenExpired.is_auth_failure());
        assert!(RideError::unauthorized("nope").is_auth_failure());
        assert!(!RideError::NetworkTimeout.is_auth_failure());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RideError::TokenMissing.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            RideError::backend_status(500, "boom").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RideError::NetworkTimeout.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RideError::InvalidConfiguration("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
