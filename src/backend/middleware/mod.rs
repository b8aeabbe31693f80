//! Middleware Module
//!
//! HTTP middleware applied in front of the relay's API handlers.
//!
//! - **`auth`** - Caller identity extraction for the publish endpoints

pub mod auth;

pub use auth::{identity_middleware, verify_matching_identity, AuthUser, AuthenticatedUser, IDENTITY_HEADER};
