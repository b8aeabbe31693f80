//! Shared Error Types
//!
//! This module defines error types used by the wire-level types in `shared`,
//! independent of the server runtime.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON encoding/decoding failures
//! - `ValidationError` - Field validation failures
//!
//! # Usage
//!
//! ```rust
//! use relayhub::shared::error::SharedError;
//!
//! let error = SharedError::validation("channel", "channel is required");
//! ```
use thiserror::Error;

/// Errors raised by shared wire types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
