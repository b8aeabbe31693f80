//! Outbound half of a relay socket.
//!
//! Two tasks write to every client socket: the frame router (echoes and
//! pongs) and the connection's broker listener. Both go through a
//! `FrameSink`, which serialises writes and applies the write deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::{mpsc, Mutex};

use super::error::RelayError;

/// Sink shared between the router and the listener of one connection
pub type SharedSink = Arc<dyn FrameSink>;

/// Write half of a client socket
#[async_trait]
pub trait FrameSink: Send + Sync + 'static {
    /// Write one text frame
    async fn send_text(&self, text: String) -> Result<(), RelayError>;

    /// Write one binary frame
    async fn send_binary(&self, data: Vec<u8>) -> Result<(), RelayError>;

    /// Close the socket
    async fn close(&self) -> Result<(), RelayError>;
}

/// `FrameSink` over the write half of an axum WebSocket
pub struct WebSocketSink {
    inner: Mutex<SplitSink<WebSocket, Message>>,
    write_timeout: Duration,
}

impl WebSocketSink {
    /// Wrap a split WebSocket writer
    pub fn new(inner: SplitSink<WebSocket, Message>, write_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(inner),
            write_timeout,
        }
    }

    async fn send(&self, message: Message) -> Result<(), RelayError> {
        let mut sink = self.inner.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.send(message)).await {
            Ok(result) => result.map_err(|e| RelayError::socket(e.to_string())),
            Err(_) => Err(RelayError::Timeout {
                operation: "write",
                after: self.write_timeout,
            }),
        }
    }
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&self, text: String) -> Result<(), RelayError> {
        self.send(Message::Text(text.into())).await
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<(), RelayError> {
        self.send(Message::Binary(data.into())).await
    }

    async fn close(&self) -> Result<(), RelayError> {
        let mut sink = self.inner.lock().await;
        match tokio::time::timeout(self.write_timeout, sink.close()).await {
            Ok(result) => result.map_err(|e| RelayError::socket(e.to_string())),
            Err(_) => Err(RelayError::Timeout {
                operation: "write",
                after: self.write_timeout,
            }),
        }
    }
}

/// `FrameSink` that hands frames to an in-process receiver.
/// Binary frames arrive as their (lossily decoded) UTF-8 text.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver its frames arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&self, text: String) -> Result<(), RelayError> {
        self.tx
            .send(text)
            .map_err(|_| RelayError::socket("receiver dropped"))
    }

    async fn send_binary(&self, data: Vec<u8>) -> Result<(), RelayError> {
        self.send_text(String::from_utf8_lossy(&data).into_owned()).await
    }

    async fn close(&self) -> Result<(), RelayError> {
        Ok(())
    }
}
