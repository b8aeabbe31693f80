/**
 * Relay Socket Routes
 *
 * Both routes upgrade to the same relay protocol; the path segment only
 * names the kind of account behind the socket.
 *
 * - `GET /chat/user/{identity}`
 * - `GET /chat/business/{identity}`
 */

use axum::{routing::get, Router};

use crate::backend::realtime::handle_relay_upgrade;
use crate::backend::server::state::AppState;

/// Configure relay socket routes
pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/chat/user/{identity}", get(handle_relay_upgrade))
        .route("/chat/business/{identity}", get(handle_relay_upgrade))
}
