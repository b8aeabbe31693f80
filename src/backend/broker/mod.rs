//! Broker Module
//!
//! The relay sits on top of a publish/subscribe broker it does not own. This
//! module defines the seam to that collaborator:
//!
//! - **`Broker`** - shared handle: publish, subscribe, count subscribers
//! - **`Subscription`** - one all-or-nothing subscription over a fixed set
//!   of channels, exclusively owned by whoever created it
//! - **`memory`** - in-process implementation, the default for a single node
//! - **`redis`** - Redis Pub/Sub, shared by every relay instance on the server
//!
//! A `Broker` is safe to share across every connection. A `Subscription`
//! is not shared: each relay connection owns exactly one at a time and
//! replaces it whenever its channel set changes.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::shared::BrokerMessage;

/// In-process broker
pub mod memory;
/// Redis Pub/Sub broker
pub mod redis;

pub use memory::MemoryBroker;
pub use self::redis::RedisBroker;

/// Broker handle shared across the server
pub type SharedBroker = Arc<dyn Broker>;

/// Failures reported by the broker collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker (or the subscription) has been shut down
    #[error("broker is closed")]
    Closed,

    /// Publishing to a channel failed
    #[error("publish to '{channel}' failed: {message}")]
    Publish {
        /// Channel the publish targeted
        channel: String,
        /// Underlying failure
        message: String,
    },

    /// Creating a subscription failed
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Tearing down a subscription failed
    #[error("unsubscribe failed: {0}")]
    Unsubscribe(String),

    /// The broker could not be reached or queried
    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Shared publish/subscribe broker
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publish `payload` on `channel`. Returns the number of subscriptions
    /// the message was handed to.
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BrokerError>;

    /// Open one subscription covering every channel in `channels`.
    /// An empty list yields a subscription that never delivers.
    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn Subscription>, BrokerError>;

    /// Number of live subscriptions that include `channel`
    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError>;
}

#[cfg(test)]
impl std::fmt::Debug for dyn Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Broker")
    }
}

/// One broker subscription over a fixed channel set
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Channels this subscription covers, in subscription order
    fn channels(&self) -> &[String];

    /// Delivery stream. Can be taken once; `None` afterwards.
    ///
    /// The stream ends when the subscription is closed.
    fn take_messages(&mut self) -> Option<mpsc::Receiver<BrokerMessage>>;

    /// Stop receiving on every channel of this subscription
    async fn unsubscribe(&mut self) -> Result<(), BrokerError>;

    /// Release the subscription and end its delivery stream
    async fn close(&mut self) -> Result<(), BrokerError>;
}
