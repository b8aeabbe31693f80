//! Server Module
//!
//! Initialises and configures the Axum HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports and documentation
//! ├── state.rs  - AppState and FromRef implementations
//! ├── config.rs - Configuration and broker loading
//! └── init.rs   - App creation
//! ```
//!
//! # State Management
//!
//! `AppState` holds the relay configuration, the shared broker handle,
//! the connection registry, the frame router and the cross-channel
//! publisher. Every field is cheap to clone and safe to share across
//! handlers.
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `RELAY_CONFIG` file, else environment
//! 2. **Broker**: Redis when `redis_url` is set, else the in-process broker
//! 3. **State Creation**: registry, router and publisher over the broker
//! 4. **Router Creation**: socket routes, API routes and middleware

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::{load_broker, load_config};
pub use init::{build_state, create_app, create_app_with_broker, InitError};
pub use state::AppState;
