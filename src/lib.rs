//! relayhub - Realtime Pub/Sub Relay
//!
//! relayhub multiplexes many client WebSocket connections onto a shared
//! publish/subscribe broker. Clients subscribe and unsubscribe to named
//! channels over their socket, publish frames to channels, and receive
//! everything published on the channels they hold. Server-side code can
//! publish to one or many channels without owning a socket.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types, configuration and shared errors
//!   - `RelayEvent`, `MultiChannelMessage`, `BrokerMessage`
//!   - `RelayConfig` and its loaders
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Broker abstraction with in-process and Redis brokers
//!   - Connections, frame router, cross-channel publisher
//!   - Axum server, routes and middleware
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - enables the `backend` module and the
//!   `relayhub-server` binary
//!
//! # Relay Protocol
//!
//! Client frames are JSON envelopes:
//!
//! ```json
//! {"event": "subscribe", "channel": "location:1", "payload": ""}
//! ```
//!
//! | event                   | effect                                         |
//! |-------------------------|------------------------------------------------|
//! | `subscribe` / `join`    | add the channel; the frame is echoed back      |
//! | `unsubscribe` / `leave` | remove one occurrence of the channel           |
//! | `message`               | publish the frame on the channel               |
//! | `ping`                  | answered with the same envelope, payload `pong`|
//!
//! Messages published on a subscribed channel arrive as
//! `{"Channel": ..., "Pattern": "", "Payload": ...}`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use relayhub::backend::server::{create_app, load_config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config()?;
//! let addr = config.bind_addr()?;
//! let app = create_app(config).await?;
//! let listener = tokio::net::TcpListener::bind(addr).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
