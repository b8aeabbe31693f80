/**
 * Relay Connection
 *
 * A `Connection` binds one client socket to a dynamic set of broker
 * channels and keeps the socket fed with whatever is published on them.
 *
 * # Reconnect
 *
 * Broker subscriptions are all-or-nothing handles over a fixed channel
 * set, so every change to the set rebuilds the subscription:
 *
 * 1. unsubscribe and close the current subscription (if any)
 * 2. signal the current listener to stop and wait for it to finish
 * 3. subscribe to the full updated channel set
 * 4. spawn a new listener over the new delivery stream
 *
 * Between steps 1 and 3 no subscription exists; afterwards the
 * subscription covers exactly `channels()`.
 *
 * # Listener
 *
 * The listener forwards each broker message to the socket as a JSON
 * `BrokerMessage` and to the connection's tap. It ends when the delivery
 * stream closes or the stop signal fires. Socket write failures are logged
 * and do not end the listener; only the router's read loop tears a
 * connection down.
 *
 * # Ownership
 *
 * All mutating operations take `&mut self` and are driven by the single
 * router loop of the socket. `disconnect` consumes the connection, so it
 * can run at most once.
 */

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::RelayError;
use super::sink::SharedSink;
use crate::backend::broker::{Broker, Subscription};
use crate::shared::BrokerMessage;

/// Capacity of the in-process message tap
const TAP_CAPACITY: usize = 64;

struct Listener {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// One live client socket bound to a broker subscription
pub struct Connection {
    id: Uuid,
    identity: String,
    channels: Vec<String>,
    subscription: Option<Box<dyn Subscription>>,
    listener: Option<Listener>,
    sink: SharedSink,
    tap: broadcast::Sender<BrokerMessage>,
}

impl Connection {
    /// Create a connection with no channels and start its (idle) listener.
    ///
    /// Fails only if the broker refuses the initial subscription.
    pub async fn connect(
        broker: &dyn Broker,
        identity: impl Into<String>,
        sink: SharedSink,
    ) -> Result<Self, RelayError> {
        let (tap, _) = broadcast::channel(TAP_CAPACITY);
        let mut connection = Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            channels: Vec::new(),
            subscription: None,
            listener: None,
            sink,
            tap,
        };
        connection.reconnect(broker).await?;
        tracing::info!(
            identity = %connection.identity,
            connection_id = %connection.id,
            "[Relay] Connection established"
        );
        Ok(connection)
    }

    /// Unique id of this connection
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Caller-supplied identity
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Subscribed channels in subscription order, duplicates included
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Channels covered by the current broker subscription
    pub fn subscription_channels(&self) -> Option<&[String]> {
        self.subscription.as_ref().map(|s| s.channels())
    }

    /// Whether a listener task is running
    pub fn is_listening(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.handle.is_finished())
    }

    /// Socket write half shared with the listener
    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Receive a copy of every broker message forwarded by this connection.
    /// The stream ends once the connection is disconnected.
    pub fn tap(&self) -> broadcast::Receiver<BrokerMessage> {
        self.tap.subscribe()
    }

    /// Add `channel` and rebuild the subscription.
    ///
    /// Repeated subscribes to the same channel are kept as separate entries.
    pub async fn subscribe(&mut self, broker: &dyn Broker, channel: &str) -> Result<(), RelayError> {
        self.channels.push(channel.to_string());
        tracing::info!(identity = %self.identity, channel, "[Relay] Subscribe");
        self.reconnect(broker).await
    }

    /// Remove the first entry equal to `channel` and rebuild the subscription.
    ///
    /// Removing a channel that is not subscribed leaves the set unchanged.
    pub async fn unsubscribe(&mut self, broker: &dyn Broker, channel: &str) -> Result<(), RelayError> {
        if let Some(index) = self.channels.iter().position(|c| c == channel) {
            let _ = self.channels.remove(index);
        }
        tracing::info!(identity = %self.identity, channel, "[Relay] Unsubscribe");
        self.reconnect(broker).await
    }

    /// Publish `content` verbatim on every subscribed channel starting with
    /// `prefix`. Stops at the first failing publish.
    ///
    /// Returns the number of publishes made.
    pub async fn broadcast(
        &self,
        broker: &dyn Broker,
        prefix: &str,
        content: &str,
    ) -> Result<usize, RelayError> {
        let mut published = 0;
        for channel in &self.channels {
            if channel.starts_with(prefix) {
                let _ = broker.publish(channel, content).await?;
                published += 1;
            } else {
                tracing::debug!(
                    identity = %self.identity,
                    channel = %channel,
                    prefix,
                    "[Relay] Broadcast skipped non-matching channel"
                );
            }
        }
        Ok(published)
    }

    /// Release the subscription, stop the listener and close the tap.
    ///
    /// The listener is stopped even when releasing the subscription fails;
    /// the release error is still returned.
    pub async fn disconnect(mut self) -> Result<(), RelayError> {
        let released = self.release_subscription().await;
        self.stop_listener().await;
        tracing::info!(
            identity = %self.identity,
            connection_id = %self.id,
            "[Relay] Connection closed"
        );
        released
    }

    async fn reconnect(&mut self, broker: &dyn Broker) -> Result<(), RelayError> {
        self.release_subscription().await?;
        self.stop_listener().await;

        let mut subscription = broker.subscribe(&self.channels).await?;
        let messages = subscription
            .take_messages()
            .ok_or(RelayError::DeliveryUnavailable)?;
        self.listener = Some(self.spawn_listener(messages));
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Unsubscribe and close the current handle. `close` runs even when
    /// `unsubscribe` fails; the first error is returned. A handle that
    /// failed to close is kept so `disconnect` can retry it.
    async fn release_subscription(&mut self) -> Result<(), RelayError> {
        let Some(mut subscription) = self.subscription.take() else {
            return Ok(());
        };

        let unsubscribed = subscription.unsubscribe().await;
        if let Err(e) = &unsubscribed {
            tracing::warn!(identity = %self.identity, "[Relay] Unsubscribe failed: {}", e);
        }
        if let Err(e) = subscription.close().await {
            tracing::warn!(identity = %self.identity, "[Relay] Closing subscription failed: {}", e);
            self.subscription = Some(subscription);
            return Err(unsubscribed.err().unwrap_or(e).into());
        }
        unsubscribed.map_err(RelayError::from)
    }

    async fn stop_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            // The listener may already have exited on a closed stream.
            let _ = listener.stop.send(());
            if let Err(e) = listener.handle.await {
                if e.is_panic() {
                    tracing::error!(identity = %self.identity, "[Relay] Listener panicked: {:?}", e);
                }
            }
        }
    }

    fn spawn_listener(&self, mut messages: mpsc::Receiver<BrokerMessage>) -> Listener {
        let (stop, mut stop_rx) = oneshot::channel::<()>();
        let sink = self.sink.clone();
        let tap = self.tap.clone();
        let identity = self.identity.clone();
        let channels = self.channels.clone();

        let handle = tokio::spawn(async move {
            if !channels.is_empty() {
                tracing::debug!(identity = %identity, ?channels, "[Relay] Listener started");
            }
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    message = messages.recv() => {
                        let Some(message) = message else { break };
                        forward(&sink, &tap, &identity, message).await;
                    }
                }
            }
            tracing::debug!(identity = %identity, "[Relay] Listener stopped");
        });

        Listener { stop, handle }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // Dropped without disconnect (e.g. the session task was aborted):
        // never leave a writer behind on the socket.
        if let Some(listener) = self.listener.take() {
            let _ = listener.stop.send(());
            listener.handle.abort();
        }
    }
}

async fn forward(
    sink: &SharedSink,
    tap: &broadcast::Sender<BrokerMessage>,
    identity: &str,
    message: BrokerMessage,
) {
    match serde_json::to_string(&message) {
        Ok(frame) => {
            tracing::debug!(identity, channel = %message.channel, "[Relay] Forwarding message");
            if let Err(e) = sink.send_text(frame).await {
                tracing::warn!(identity, channel = %message.channel, "[Relay] Write failed: {}", e);
            }
        }
        Err(e) => {
            tracing::error!(identity, "[Relay] Failed to encode broker message: {:?}", e);
        }
    }
    // No tap receivers is the common case.
    let _ = tap.send(message);
}
