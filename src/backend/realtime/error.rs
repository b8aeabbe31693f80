/**
 * Relay Errors
 *
 * Errors raised by connections, the frame router and the cross-channel
 * publisher. Broker failures are wrapped as-is so callers can tell a
 * broker outage from a socket problem.
 */

use std::time::Duration;

use thiserror::Error;

use crate::backend::broker::BrokerError;
use crate::shared::SharedError;

/// Relay-level failures
#[derive(Debug, Error)]
pub enum RelayError {
    /// Broker collaborator failure
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Single-channel publish found nobody listening
    #[error("channel '{channel}' does not exist")]
    ChannelNotFound {
        /// Channel that had no subscribers
        channel: String,
    },

    /// Socket read or write failure
    #[error("socket error: {0}")]
    Socket(String),

    /// A socket operation exceeded its deadline
    #[error("socket {operation} timed out after {after:?}")]
    Timeout {
        /// `read` or `write`
        operation: &'static str,
        /// Deadline that expired
        after: Duration,
    },

    /// Encoding or decoding failure
    #[error(transparent)]
    Shared(#[from] SharedError),

    /// The broker handed out a subscription whose delivery stream was already taken
    #[error("subscription delivery stream unavailable")]
    DeliveryUnavailable,
}

impl RelayError {
    /// Create a socket error
    pub fn socket(message: impl Into<String>) -> Self {
        Self::Socket(message.into())
    }

    /// Whether this error came from the broker
    pub fn is_broker(&self) -> bool {
        matches!(self, Self::Broker(_))
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Shared(err.into())
    }
}
