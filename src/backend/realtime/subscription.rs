/**
 * Relay Socket Handler
 *
 * Upgrades `GET /chat/{user,business}/{identity}` to a WebSocket and runs
 * one relay session over it.
 *
 * # Session
 *
 * 1. split the socket; the write half becomes the connection's `FrameSink`
 * 2. `Connection::connect` with an empty channel set
 * 3. register the connection in the `ConnectionRegistry`
 * 4. run the `RelayRouter` read loop until the session closes
 * 5. unregister and close the socket
 *
 * # Inbound Frames
 *
 * Text frames are passed through. Binary frames are read as UTF-8 text,
 * keep their frame type for echoes, and are skipped if they are not valid
 * UTF-8. Ping/pong control frames are answered by axum and skipped here. A
 * close frame ends the stream.
 */

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::future;
use futures_util::stream::{BoxStream, SplitStream};
use futures_util::StreamExt;

use super::connection::Connection;
use super::error::RelayError;
use super::registry::ConnectionInfo;
use super::router::InboundFrame;
use super::sink::{SharedSink, WebSocketSink};
use crate::backend::server::state::AppState;

/// Upgrade to the relay protocol (GET /chat/user/{identity}, GET /chat/business/{identity})
pub async fn handle_relay_upgrade(
    ws: WebSocketUpgrade,
    Path(identity): Path<String>,
    State(state): State<AppState>,
) -> Response {
    tracing::debug!(identity = %identity, "[Relay] Upgrade requested");
    ws.on_upgrade(move |socket| run_socket(socket, identity, state))
}

/// Run one relay session over an upgraded socket
pub async fn run_socket(socket: WebSocket, identity: String, state: AppState) {
    let (writer, reader) = socket.split();
    let sink: SharedSink = Arc::new(WebSocketSink::new(writer, state.config.write_timeout()));

    let connection = match Connection::connect(state.broker.as_ref(), identity.clone(), sink.clone()).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(identity = %identity, "[Relay] Failed to open connection: {}", e);
            let _ = sink.close().await;
            return;
        }
    };

    let connection_id = connection.id();
    state
        .registry
        .register(ConnectionInfo::new(connection_id, identity.clone()))
        .await;

    let reason = state.router.run(connection, inbound_frames(reader)).await;

    let _ = state.registry.unregister(&identity, connection_id).await;
    if let Err(e) = sink.close().await {
        tracing::debug!(identity = %identity, %reason, "[Relay] Socket already closed: {}", e);
    }
}

/// Each inbound data frame, ending at the first close frame
pub fn inbound_frames(reader: SplitStream<WebSocket>) -> BoxStream<'static, Result<InboundFrame, RelayError>> {
    reader
        .take_while(|frame| future::ready(!matches!(frame, Ok(Message::Close(_)))))
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(message) => inbound_frame(message).map(Ok),
                Err(e) => Some(Err(RelayError::socket(e.to_string()))),
            })
        })
        .boxed()
}

/// Data frame carried by a message; `None` for control frames and non-UTF-8 binary
pub fn inbound_frame(message: Message) -> Option<InboundFrame> {
    match message {
        Message::Text(text) => Some(InboundFrame::Text(text.as_str().to_owned())),
        Message::Binary(data) => match String::from_utf8(data.to_vec()) {
            Ok(text) => Some(InboundFrame::Binary(text)),
            Err(_) => {
                tracing::debug!(len = data.len(), "[Relay] Non-UTF-8 binary frame skipped");
                None
            }
        },
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}
