/**
 * Backend Error Types
 *
 * # Status Mapping
 *
 * | variant                         | status                     |
 * |---------------------------------|----------------------------|
 * | `HandlerError`                  | carried status             |
 * | `ProtocolError`                 | 400 Bad Request            |
 * | `SharedError` (validation)      | 400 Bad Request            |
 * | `SharedError` (serialization)   | 500 Internal Server Error  |
 * | `Relay(ChannelNotFound)`        | 404 Not Found              |
 * | `Relay(Broker)`                 | 502 Bad Gateway            |
 * | `Relay(Timeout)`                | 504 Gateway Timeout        |
 * | other `Relay`                   | 500 Internal Server Error  |
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::realtime::RelayError;
use crate::shared::SharedError;

/// Backend-specific error types
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request-level failure (missing identity, forbidden publisher, ...)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Malformed relay payload
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Connection or publisher failure
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            Self::SharedError(err) => shared_status(err),
            Self::Relay(err) => match err {
                RelayError::ChannelNotFound { .. } => StatusCode::NOT_FOUND,
                RelayError::Broker(_) => StatusCode::BAD_GATEWAY,
                RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RelayError::Shared(err) => shared_status(err),
                RelayError::Socket(_) | RelayError::DeliveryUnavailable => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Human-readable error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::ProtocolError { message, .. } => message.clone(),
            Self::SharedError(err) => err.to_string(),
            Self::Relay(err) => err.to_string(),
        }
    }
}

fn shared_status(err: &SharedError) -> StatusCode {
    match err {
        SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
    }
}
