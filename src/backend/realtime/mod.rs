//! Real-time Relay Module
//!
//! Multiplexes client WebSockets onto the shared broker.
//!
//! # Architecture
//!
//! - **`connection`** - one socket bound to a dynamic set of broker channels
//! - **`router`** - decodes inbound frames and drives a connection
//! - **`broadcast`** - server-side cross-channel publisher
//! - **`registry`** - live connections by identity
//! - **`sink`** - write half of a socket behind the `FrameSink` trait
//! - **`subscription`** - WebSocket upgrade handler
//! - **`handlers`** - publish and stats endpoints
//! - **`error`** - `RelayError`
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── connection.rs   - Connection lifecycle and listener
//! ├── router.rs       - Frame dispatch and read loop
//! ├── broadcast.rs    - Cross-channel publisher
//! ├── registry.rs     - Connection registry
//! ├── sink.rs         - FrameSink implementations
//! ├── subscription.rs - Socket upgrade handler
//! ├── handlers.rs     - HTTP handlers
//! └── error.rs        - Relay errors
//! ```
//!
//! # Data Flow
//!
//! ```text
//! client ──frame──▶ RelayRouter ──publish──▶ Broker
//!                        │                     │
//!                  subscribe/unsubscribe       │ deliver
//!                        ▼                     ▼
//!                    Connection ◀──listener── Subscription
//!                        │
//!                        └──FrameSink──▶ client
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use relayhub::backend::broker::MemoryBroker;
//! use relayhub::backend::realtime::{ChannelSink, Connection};
//!
//! # async fn example() -> Result<(), relayhub::backend::realtime::RelayError> {
//! let broker = MemoryBroker::new();
//! let (sink, _frames) = ChannelSink::new();
//! let mut connection = Connection::connect(&broker, "store-1", Arc::new(sink)).await?;
//! connection.subscribe(&broker, "location:1").await?;
//! connection.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod sink;
pub mod subscription;

pub use broadcast::{publish, CrossChannelPublisher};
pub use connection::Connection;
pub use error::RelayError;
pub use handlers::{connection_stats, publish_channel, publish_order};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use router::{CloseReason, InboundFrame, RelayRouter};
pub use sink::{ChannelSink, FrameSink, SharedSink, WebSocketSink};
pub use subscription::handle_relay_upgrade;
