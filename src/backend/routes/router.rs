/**
 * Router Configuration
 *
 * Combines the socket and API routes into a single Axum router.
 *
 * # Route Order
 *
 * 1. Socket routes
 * 2. API routes
 * 3. Health check
 * 4. Fallback handler (404)
 *
 * Every request runs inside a `TraceLayer` span.
 */

use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::chat_routes::configure_chat_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_chat_routes(Router::new());
    let router = configure_api_routes(router);

    let router = router.route("/health", get(health));

    // Fallback handler for 404
    let router = router.fallback(|| async { (StatusCode::NOT_FOUND, "404 Not Found") });

    router.layer(TraceLayer::new_for_http()).with_state(app_state)
}

/// Liveness check (GET /health)
async fn health() -> &'static str {
    "OK"
}
