/**
 * API Routes
 *
 * ## Publishing (requires `x-user-id`)
 * - `POST /api/v1/ui/order/publish/{publisher}`
 * - `POST /api/v1/ui/channel/publish/{publisher}`
 *
 * ## Statistics
 * - `GET /api/v1/ws/stats`
 */

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::backend::middleware::identity_middleware;
use crate::backend::realtime::{connection_stats, publish_channel, publish_order};
use crate::backend::server::state::AppState;

/// Configure API routes
///
/// The identity middleware is attached as a route layer, so it only runs
/// for requests that matched a publish route.
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    let publish = Router::new()
        .route("/api/v1/ui/order/publish/{publisher}", post(publish_order))
        .route("/api/v1/ui/channel/publish/{publisher}", post(publish_channel))
        .route_layer(middleware::from_fn(identity_middleware));

    router
        .merge(publish)
        .route("/api/v1/ws/stats", get(connection_stats))
}
