/**
 * Relay Router
 *
 * Owns the read loop of one socket: decodes each inbound frame and drives
 * the socket's `Connection`.
 *
 * # Events
 *
 * | event                   | action                                              |
 * |-------------------------|-----------------------------------------------------|
 * | `subscribe` / `join`    | `Connection::subscribe`, then echo the raw frame     |
 * |                         | with the frame type it arrived as                    |
 * | `unsubscribe` / `leave` | `Connection::unsubscribe` (no echo)                  |
 * | `message`               | publish the raw frame; guest traffic is mirrored to  |
 * |                         | the connection's staff channels                      |
 * | `ping`                  | write the envelope back with the pong payload        |
 * | anything else           | dropped                                              |
 *
 * Frames that fail to decode, or that omit a required channel, are
 * dropped and the loop keeps reading.
 *
 * # Session Lifecycle
 *
 * A session is `Open` from the moment its connection exists until the
 * first read error, read deadline, peer close or fatal dispatch error. The
 * connection is always disconnected before `run` returns.
 */

use std::fmt;
use std::time::Duration;

use futures_util::{Stream, StreamExt};

use super::broadcast::publish;
use super::connection::Connection;
use super::error::RelayError;
use super::sink::SharedSink;
use crate::backend::broker::SharedBroker;
use crate::shared::{EventKind, RelayConfig, RelayEvent};

/// Why a relay session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the socket
    PeerClosed,
    /// Reading from the socket failed
    ReadError(String),
    /// Nothing was read within the read deadline
    ReadTimeout,
    /// Dispatching a frame failed; the connection was dropped
    Fatal(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => write!(f, "peer closed"),
            Self::ReadError(e) => write!(f, "read error: {}", e),
            Self::ReadTimeout => write!(f, "read timeout"),
            Self::Fatal(e) => write!(f, "fatal: {}", e),
        }
    }
}

/// One data frame read from a client socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text frame
    Text(String),
    /// Binary frame carrying UTF-8 text
    Binary(String),
}

impl InboundFrame {
    /// Text carried by the frame
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) | Self::Binary(text) => text,
        }
    }

    /// Write the frame back unchanged, as the same frame type
    async fn echo(&self, sink: &SharedSink) -> Result<(), RelayError> {
        match self {
            Self::Text(text) => sink.send_text(text.clone()).await,
            Self::Binary(text) => sink.send_binary(text.clone().into_bytes()).await,
        }
    }
}

impl From<String> for InboundFrame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for InboundFrame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

/// Decodes inbound frames and dispatches them to connections
pub struct RelayRouter {
    broker: SharedBroker,
    guest_prefix: String,
    staff_prefix: String,
    pong_payload: String,
    read_timeout: Duration,
}

impl RelayRouter {
    /// Create a router over `broker` using the prefixes, pong payload and
    /// read deadline from `config`
    pub fn new(broker: SharedBroker, config: &RelayConfig) -> Self {
        Self {
            broker,
            guest_prefix: config.guest_prefix.clone(),
            staff_prefix: config.staff_prefix.clone(),
            pong_payload: config.pong_payload.clone(),
            read_timeout: config.read_timeout(),
        }
    }

    /// Shared broker handle
    pub fn broker(&self) -> &SharedBroker {
        &self.broker
    }

    /// Run the read loop until the session closes, then disconnect.
    ///
    /// `frames` yields each inbound data frame (plain strings are text
    /// frames); the stream ending means the peer closed the socket.
    pub async fn run<S, F>(&self, mut connection: Connection, mut frames: S) -> CloseReason
    where
        S: Stream<Item = Result<F, RelayError>> + Unpin + Send,
        F: Into<InboundFrame>,
    {
        let reason = loop {
            let frame: InboundFrame = match tokio::time::timeout(self.read_timeout, frames.next()).await {
                Ok(Some(Ok(frame))) => frame.into(),
                Ok(Some(Err(e))) => break CloseReason::ReadError(e.to_string()),
                Ok(None) => break CloseReason::PeerClosed,
                Err(_) => break CloseReason::ReadTimeout,
            };

            if let Err(e) = self.dispatch_frame(&mut connection, &frame).await {
                tracing::error!(identity = %connection.identity(), "[Relay] Dropping connection: {}", e);
                break CloseReason::Fatal(e.to_string());
            }
        };

        let identity = connection.identity().to_string();
        tracing::info!(identity = %identity, %reason, "[Relay] Session closed");
        if let Err(e) = connection.disconnect().await {
            tracing::warn!(identity = %identity, "[Relay] Disconnect failed: {}", e);
        }
        reason
    }

    /// Handle one inbound text frame. See `dispatch_frame`.
    pub async fn dispatch(&self, connection: &mut Connection, raw: &str) -> Result<(), RelayError> {
        self.dispatch_frame(connection, &InboundFrame::from(raw)).await
    }

    /// Handle one inbound frame.
    ///
    /// # Errors
    ///
    /// Broker failures and failed pong writes. The caller must disconnect.
    pub async fn dispatch_frame(
        &self,
        connection: &mut Connection,
        frame: &InboundFrame,
    ) -> Result<(), RelayError> {
        let raw = frame.as_str();
        let event = match RelayEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(identity = %connection.identity(), "[Relay] Malformed frame skipped: {}", e);
                return Ok(());
            }
        };

        let kind = event.kind();
        if kind.requires_channel() && event.channel.is_empty() {
            tracing::warn!(
                identity = %connection.identity(),
                event = %event.event,
                "[Relay] Frame without channel skipped"
            );
            return Ok(());
        }

        let broker = self.broker.as_ref();
        match kind {
            EventKind::Subscribe => {
                connection.subscribe(broker, &event.channel).await?;
                if let Err(e) = frame.echo(connection.sink()).await {
                    tracing::warn!(identity = %connection.identity(), "[Relay] Subscribe echo failed: {}", e);
                }
            }
            EventKind::Unsubscribe => {
                connection.unsubscribe(broker, &event.channel).await?;
            }
            EventKind::Message => {
                let _ = publish(broker, &event.channel, raw).await?;
                if event.channel.starts_with(&self.guest_prefix) {
                    let mirrored = connection.broadcast(broker, &self.staff_prefix, raw).await?;
                    tracing::debug!(
                        identity = %connection.identity(),
                        channel = %event.channel,
                        mirrored,
                        "[Relay] Guest message mirrored to staff channels"
                    );
                }
            }
            EventKind::Ping => {
                let pong = event.pong(&self.pong_payload).to_json()?;
                connection.sink().send_text(pong).await?;
            }
            EventKind::Other(name) => {
                tracing::debug!(identity = %connection.identity(), event = %name, "[Relay] Unknown event ignored");
            }
        }
        Ok(())
    }
}
