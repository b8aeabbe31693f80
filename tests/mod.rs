//! Test suite for relayhub
//!
//! - `common` - recording broker and sink doubles
//! - `integration` - relay and HTTP API through the public API
//! - `property` - proptest invariants
//! - `e2e` - real sockets against a served app

#[cfg(feature = "ssr")]
pub mod e2e;
