/**
 * Server Initialization
 *
 * Builds the application state and the router. The binary calls
 * `create_app`; tests call `create_app_with_broker` to keep a handle on
 * the broker they inject.
 */

use axum::Router;
use thiserror::Error;

use crate::backend::broker::{BrokerError, SharedBroker};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::load_broker;
use crate::backend::server::state::AppState;
use crate::shared::{ConfigError, RelayConfig};

/// Server startup failures
#[derive(Debug, Error)]
pub enum InitError {
    /// Invalid relay configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The configured broker could not be reached
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Validate `config` and assemble the state around `broker`
pub fn build_state(config: RelayConfig, broker: SharedBroker) -> Result<AppState, ConfigError> {
    config.validate()?;
    Ok(AppState::new(config, broker))
}

/// Create the application over the broker described by `config`
pub async fn create_app(config: RelayConfig) -> Result<Router<()>, InitError> {
    tracing::info!("Initializing relayhub server");
    config.validate()?;
    let broker = load_broker(&config).await?;
    Ok(create_app_with_broker(config, broker)?)
}

/// Create the application over an existing broker
pub fn create_app_with_broker(config: RelayConfig, broker: SharedBroker) -> Result<Router<()>, ConfigError> {
    let state = build_state(config, broker)?;
    tracing::info!(
        guest_prefix = %state.config.guest_prefix,
        staff_prefix = %state.config.staff_prefix,
        "[Relay] State initialized"
    );
    Ok(create_router(state))
}
