/**
 * Server Configuration
 *
 * Loads the `RelayConfig` and the broker the server runs against
 * (Redis when `RELAY_REDIS_URL` is set, in-process otherwise).
 *
 * # Configuration Sources
 *
 * 1. `RELAY_CONFIG=<path>`: TOML file, missing keys take defaults
 * 2. otherwise the environment (`SERVER_HOST`, `SERVER_PORT`, `RELAY_*`)
 *
 * Either way the result is validated before the server starts; unlike
 * optional services, a bad relay configuration aborts startup.
 */

use std::sync::Arc;

use crate::backend::broker::{BrokerError, MemoryBroker, RedisBroker, SharedBroker};
use crate::shared::config::{ConfigError, RelayConfig, CONFIG_PATH_ENV};

/// Load the relay configuration
///
/// # Errors
///
/// Unreadable or invalid configuration file, unparsable or invalid
/// environment values
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(path = %path, "[Config] Loading relay configuration from file");
            RelayConfig::from_file(path.trim())
        }
        _ => {
            tracing::info!("[Config] Loading relay configuration from environment");
            RelayConfig::from_env()
        }
    }
}

/// Create the broker described by `config`
///
/// With `redis_url` set the relay runs on Redis Pub/Sub, shared with every
/// other relay process on that server. Otherwise it uses the in-process
/// broker and each process is its own pub/sub domain.
///
/// # Errors
///
/// The Redis server cannot be reached
pub async fn load_broker(config: &RelayConfig) -> Result<SharedBroker, BrokerError> {
    match &config.redis_url {
        Some(url) => {
            tracing::info!(timeout = ?config.redis_timeout(), "[Config] Using Redis broker");
            let broker = RedisBroker::connect(url, config.redis_timeout(), config.broker_buffer).await?;
            Ok(Arc::new(broker))
        }
        None => {
            tracing::info!(buffer = config.broker_buffer, "[Config] Using in-process broker");
            Ok(Arc::new(MemoryBroker::with_buffer(config.broker_buffer)))
        }
    }
}
