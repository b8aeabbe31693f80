/**
 * Application State Management
 *
 * `AppState` is the central state container of the relay server. The
 * `FromRef` implementations let handlers extract only the part they need.
 *
 * ```rust,no_run
 * use axum::extract::State;
 * use relayhub::backend::realtime::ConnectionRegistry;
 *
 * async fn handler(State(registry): State<ConnectionRegistry>) -> String {
 *     registry.len().await.to_string()
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::broker::SharedBroker;
use crate::backend::realtime::{ConnectionRegistry, CrossChannelPublisher, RelayRouter};
use crate::shared::RelayConfig;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Validated relay configuration
    pub config: Arc<RelayConfig>,

    /// Broker shared by every connection and the publisher
    pub broker: SharedBroker,

    /// Live socket connections
    pub registry: ConnectionRegistry,

    /// Frame router driving each socket's read loop
    pub router: Arc<RelayRouter>,

    /// Server-side publisher used by the publish endpoints
    pub publisher: CrossChannelPublisher,
}

impl AppState {
    /// Assemble the state around `broker`
    pub fn new(config: RelayConfig, broker: SharedBroker) -> Self {
        let router = Arc::new(RelayRouter::new(broker.clone(), &config));
        let publisher = CrossChannelPublisher::new(broker.clone());
        Self {
            config: Arc::new(config),
            broker,
            registry: ConnectionRegistry::new(),
            router,
            publisher,
        }
    }
}

impl FromRef<AppState> for ConnectionRegistry {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for CrossChannelPublisher {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.publisher.clone()
    }
}

impl FromRef<AppState> for Arc<RelayConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
