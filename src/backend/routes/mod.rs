//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── chat_routes.rs  - Relay socket routes
//! └── api_routes.rs   - Publish and stats endpoints
//! ```
//!
//! # Routes
//!
//! ## Socket Routes
//!
//! - `GET /chat/user/{identity}` - Relay socket for an end user
//! - `GET /chat/business/{identity}` - Relay socket for a business account
//!
//! ## API Routes
//!
//! - `POST /api/v1/ui/order/publish/{publisher}` - Multi-channel publish
//! - `POST /api/v1/ui/channel/publish/{publisher}` - Single live channel publish
//! - `GET /api/v1/ws/stats` - Connection statistics
//!
//! ## Other
//!
//! - `GET /health` - Liveness check
//! - anything else - 404

/// Main router creation
pub mod router;

/// Relay socket routes
pub mod chat_routes;

/// API endpoint routes
pub mod api_routes;

pub use router::create_router;
