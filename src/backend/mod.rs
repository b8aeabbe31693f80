//! Backend Module
//!
//! Server-side code of the relay: the broker abstraction, the realtime
//! relay itself and the Axum server that exposes it.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`broker`** - `Broker`/`Subscription` traits, in-process and Redis brokers
//! - **`realtime`** - connections, frame router, publisher, registry
//! - **`server`** - application state, configuration loading, app creation
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`middleware`** - caller identity extraction
//! - **`error`** - HTTP-facing error type
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs       - Module exports and documentation
//! ├── main.rs      - relayhub-server binary
//! ├── broker/      - Pub/sub broker
//! ├── realtime/    - Relay connections and publishing
//! ├── server/      - Server initialization and state
//! ├── routes/      - Route configuration
//! ├── middleware/  - Request middleware
//! └── error/       - Error types
//! ```
//!
//! # Concurrency
//!
//! Each socket runs one router task that owns its `Connection`, plus one
//! listener task per live broker subscription. Writes from both tasks are
//! serialised by the socket's `FrameSink`. Everything else in `AppState`
//! is shared behind `Arc`.

/// Pub/sub broker abstraction
pub mod broker;

/// Real-time relay
pub mod realtime;

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Middleware for request processing
pub mod middleware;

/// Backend error types
pub mod error;

pub use broker::{Broker, BrokerError, MemoryBroker, RedisBroker, SharedBroker, Subscription};
pub use error::BackendError;
pub use realtime::{Connection, CrossChannelPublisher, RelayError, RelayRouter};
pub use server::{create_app, AppState};
