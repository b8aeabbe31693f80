//! Backend Error Module
//!
//! Errors returned by HTTP handlers and their conversion to responses.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! # Error Types
//!
//! - `HandlerError` - Request-level failures with an explicit status
//! - `ProtocolError` - Malformed relay payloads
//! - `SharedError` - Errors from the shared module
//! - `Relay` - Connection and publisher failures
//!
//! Every variant maps to an HTTP status through `BackendError::status_code`
//! and renders as `{"error": ..., "status": ...}`.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::BackendError;
