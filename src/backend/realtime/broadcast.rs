/**
 * Cross-Channel Publishing
 *
 * Server-side code (REST handlers, background jobs) pushes messages to
 * relay clients through this module without owning a socket.
 *
 * # Fan-out
 *
 * `publish_to_channels` stamps one `RelayEvent` per destination channel
 * and publishes them in order. Publishing is fail-fast: the first failure
 * is returned, channels already published stay published and the rest
 * are not attempted.
 *
 * # Liveness Check
 *
 * `publish_to_channel` first asks the broker whether anyone listens on the
 * channel and refuses with `RelayError::ChannelNotFound` if not. A
 * subscriber may still leave between the check and the publish.
 */

use crate::backend::broker::{Broker, SharedBroker};
use crate::backend::realtime::error::RelayError;
use crate::shared::{MultiChannelMessage, RelayEvent};

/// Publish `content` on `channel`
///
/// # Returns
///
/// Number of subscriptions the broker handed the message to (0 if nobody listens)
pub async fn publish(broker: &dyn Broker, channel: &str, content: &str) -> Result<usize, RelayError> {
    let delivered = broker.publish(channel, content).await?;
    tracing::debug!(channel, delivered, "[Relay] Published on channel");
    Ok(delivered)
}

/// Stateless publisher over the shared broker handle
#[derive(Clone)]
pub struct CrossChannelPublisher {
    broker: SharedBroker,
}

impl CrossChannelPublisher {
    /// Create a publisher over `broker`
    pub fn new(broker: SharedBroker) -> Self {
        Self { broker }
    }

    /// Publish a copy of `message` on each of its channels, in order.
    ///
    /// # Returns
    ///
    /// Number of channels published to
    ///
    /// # Errors
    ///
    /// The first encoding or broker failure. Earlier channels are not rolled back.
    pub async fn publish_to_channels(&self, message: &MultiChannelMessage) -> Result<usize, RelayError> {
        tracing::info!(
            subject = %message.subject,
            channels = ?message.channels,
            "[Relay] Publishing to channels"
        );

        for (published, channel) in message.channels.iter().enumerate() {
            let frame = message.for_channel(channel).to_json()?;
            if let Err(e) = publish(self.broker.as_ref(), channel, &frame).await {
                tracing::error!(
                    channel = %channel,
                    published,
                    "[Relay] Fan-out stopped: {}",
                    e
                );
                return Err(e);
            }
        }
        Ok(message.channels.len())
    }

    /// Publish `message` on `channel` if at least one subscriber is listening
    ///
    /// # Errors
    ///
    /// `RelayError::ChannelNotFound` when the channel has no subscribers,
    /// or the broker/encoding failure.
    pub async fn publish_to_channel(&self, channel: &str, message: &RelayEvent) -> Result<usize, RelayError> {
        if !self.has_channel(channel).await? {
            tracing::warn!(channel, "[Relay] Channel does not exist");
            return Err(RelayError::ChannelNotFound {
                channel: channel.to_string(),
            });
        }

        let frame = message.to_json()?;
        publish(self.broker.as_ref(), channel, &frame).await
    }

    /// Whether anyone currently subscribes to `channel`
    pub async fn has_channel(&self, channel: &str) -> Result<bool, RelayError> {
        Ok(self.broker.subscriber_count(channel).await? > 0)
    }
}
