//! Shared Module
//!
//! This module contains the types that describe the relay protocol itself:
//! socket frames, broker deliveries, configuration and their errors. None
//! of it depends on the server runtime, so clients and tools can reuse it
//! without enabling the `ssr` feature.

/// Socket frames and broker deliveries
pub mod event;

/// Shared error types
pub mod error;

/// Relay configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use event::{BrokerMessage, EventKind, MultiChannelMessage, RelayEvent, PONG_PAYLOAD};
pub use error::SharedError;
pub use config::{ConfigError, RelayConfig, RelayConfigBuilder};
