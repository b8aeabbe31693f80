//! In-process broker for single-node deployments and tests.
//!
//! Every subscription gets its own bounded delivery queue. Publishing walks
//! the live subscriptions and hands the message to each one covering the
//! channel; a full queue drops the message for that subscriber only.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Broker, BrokerError, Subscription};
use crate::shared::BrokerMessage;

/// Default per-subscription delivery buffer
pub const DEFAULT_BUFFER: usize = 256;

#[derive(Default)]
struct Registry {
    next_id: u64,
    closed: bool,
    subscribers: HashMap<u64, Subscriber>,
}

struct Subscriber {
    channels: Vec<String>,
    tx: mpsc::Sender<BrokerMessage>,
}

impl Subscriber {
    fn covers(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory publish/subscribe broker. Clones share the same channels.
#[derive(Clone)]
pub struct MemoryBroker {
    registry: Arc<Mutex<Registry>>,
    buffer: usize,
}

impl MemoryBroker {
    /// Creates a broker with the default delivery buffer
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    /// Creates a broker whose subscriptions buffer up to `buffer` messages
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            buffer: buffer.max(1),
        }
    }

    /// Number of open subscriptions
    pub fn subscription_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Channel sets of every open subscription, oldest first
    pub fn active_subscriptions(&self) -> Vec<Vec<String>> {
        let registry = lock(&self.registry);
        let mut ids: Vec<_> = registry.subscribers.keys().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .filter_map(|id| registry.subscribers.get(id))
            .map(|s| s.channels.clone())
            .collect()
    }

    /// Shut the broker down, ending every delivery stream.
    /// Later calls fail with `BrokerError::Closed`.
    pub fn shutdown(&self) {
        let mut registry = lock(&self.registry);
        registry.closed = true;
        registry.subscribers.clear();
        tracing::info!("[Broker] In-memory broker shut down");
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, BrokerError> {
        let registry = lock(&self.registry);
        if registry.closed {
            return Err(BrokerError::Closed);
        }

        let mut delivered = 0;
        for (id, subscriber) in registry.subscribers.iter().filter(|(_, s)| s.covers(channel)) {
            match subscriber.tx.try_send(BrokerMessage::new(channel, payload)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(subscription = id, channel, "[Broker] Delivery queue full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(subscription = id, channel, "[Broker] Subscriber gone, message dropped");
                }
            }
        }
        tracing::debug!(channel, delivered, "[Broker] Published");
        Ok(delivered)
    }

    async fn subscribe(&self, channels: &[String]) -> Result<Box<dyn Subscription>, BrokerError> {
        let mut registry = lock(&self.registry);
        if registry.closed {
            return Err(BrokerError::Closed);
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.subscribers.insert(
            id,
            Subscriber {
                channels: channels.to_vec(),
                tx,
            },
        );

        Ok(Box::new(MemorySubscription {
            id,
            channels: channels.to_vec(),
            messages: Some(rx),
            registry: self.registry.clone(),
            closed: false,
        }))
    }

    async fn subscriber_count(&self, channel: &str) -> Result<usize, BrokerError> {
        let registry = lock(&self.registry);
        if registry.closed {
            return Err(BrokerError::Closed);
        }
        Ok(registry.subscribers.values().filter(|s| s.covers(channel)).count())
    }
}

/// Subscription handed out by `MemoryBroker`
pub struct MemorySubscription {
    id: u64,
    channels: Vec<String>,
    messages: Option<mpsc::Receiver<BrokerMessage>>,
    registry: Arc<Mutex<Registry>>,
    closed: bool,
}

impl MemorySubscription {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = lock(&self.registry).subscribers.remove(&self.id);
        }
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn take_messages(&mut self) -> Option<mpsc::Receiver<BrokerMessage>> {
        self.messages.take()
    }

    async fn unsubscribe(&mut self) -> Result<(), BrokerError> {
        if self.closed {
            return Ok(());
        }
        let mut registry = lock(&self.registry);
        if let Some(subscriber) = registry.subscribers.get_mut(&self.id) {
            subscriber.channels.clear();
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.release();
        Ok(())
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.release();
    }
}
