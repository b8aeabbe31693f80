/**
 * Relay HTTP Handlers
 *
 * Server-side entry points into the relay:
 *
 * - `POST /api/v1/ui/order/publish/{publisher}` - fan a `MultiChannelMessage`
 *   out to each of its channels
 * - `POST /api/v1/ui/channel/publish/{publisher}` - publish a `RelayEvent` on
 *   its channel if anyone is listening
 * - `GET /api/v1/ws/stats` - live connection counts
 *
 * The publish endpoints sit behind `identity_middleware`; the caller must
 * publish as itself. Bodies are parsed by hand so that malformed JSON is a
 * 400 like every other protocol error.
 */

use axum::{
    extract::{Path, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::broadcast::CrossChannelPublisher;
use super::registry::ConnectionRegistry;
use crate::backend::error::BackendError;
use crate::backend::middleware::{verify_matching_identity, AuthUser};
use crate::shared::{MultiChannelMessage, RelayEvent, SharedError};

/// Publish to several channels (POST /api/v1/ui/order/publish/{publisher})
///
/// # Errors
///
/// * `401 Unauthorized` - no caller identity
/// * `403 Forbidden` - caller is not `{publisher}`
/// * `400 Bad Request` - malformed body
/// * `502 Bad Gateway` - broker failure; earlier channels stay published
pub async fn publish_order(
    State(publisher): State<CrossChannelPublisher>,
    AuthUser(user): AuthUser,
    Path(publisher_id): Path<String>,
    body: String,
) -> Result<Json<Value>, BackendError> {
    verify_matching_identity(&user, &publisher_id)?;
    let message: MultiChannelMessage = parse_body(&body)?;

    let published = publisher.publish_to_channels(&message).await?;
    tracing::info!(publisher = %publisher_id, published, "[Relay] Order published");
    Ok(Json(json!({ "result": "OK" })))
}

/// Publish to one live channel (POST /api/v1/ui/channel/publish/{publisher})
///
/// # Errors
///
/// Same as `publish_order`, plus `404 Not Found` when the channel has no
/// subscribers and `400 Bad Request` when the event names no channel
pub async fn publish_channel(
    State(publisher): State<CrossChannelPublisher>,
    AuthUser(user): AuthUser,
    Path(publisher_id): Path<String>,
    body: String,
) -> Result<Json<Value>, BackendError> {
    verify_matching_identity(&user, &publisher_id)?;
    let event: RelayEvent = parse_body(&body)?;
    if event.channel.is_empty() {
        return Err(SharedError::validation("channel", "channel is required").into());
    }

    let delivered = publisher.publish_to_channel(&event.channel, &event).await?;
    tracing::info!(publisher = %publisher_id, channel = %event.channel, delivered, "[Relay] Event published");
    Ok(Json(json!({ "result": "OK" })))
}

/// Connection statistics (GET /api/v1/ws/stats)
pub async fn connection_stats(State(registry): State<ConnectionRegistry>) -> Json<Value> {
    Json(json!({
        "connections": registry.len().await,
        "identities": registry.identities().await,
    }))
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::protocol(format!("invalid request body: {}", e)))
}
