//! Relay configuration module
//!
//! `RelayConfig` carries everything the relay needs at runtime: the listen
//! address, the channel prefixes used for cross-role mirroring, the ping
//! acknowledgment payload, the socket deadlines and the broker to run on
//! (in-process unless a Redis URL is given).
//!
//! Configuration comes from either a TOML file (selected with `RELAY_CONFIG`)
//! or individual environment variables, with defaults suitable for local
//! development.

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::event::PONG_PAYLOAD;

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Channel prefix of end-user (guest) traffic
    pub guest_prefix: String,
    /// Channel prefix that guest traffic is mirrored to
    pub staff_prefix: String,
    /// Payload written back for `ping` frames
    pub pong_payload: String,
    /// Seconds a socket may stay silent before it is dropped
    pub read_timeout_secs: u64,
    /// Seconds a single socket write may take
    pub write_timeout_secs: u64,
    /// Per-subscription delivery buffer on the broker
    pub broker_buffer: usize,
    /// Redis server shared by every relay instance; `None` runs the
    /// in-process broker
    pub redis_url: Option<String>,
    /// Milliseconds a single Redis command may take
    pub redis_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            guest_prefix: "guest".to_string(),
            staff_prefix: "location".to_string(),
            pong_payload: PONG_PAYLOAD.to_string(),
            read_timeout_secs: 120,
            write_timeout_secs: 10,
            broker_buffer: 256,
            redis_url: None,
            redis_timeout_ms: 2000,
        }
    }
}

impl RelayConfig {
    /// Create a new RelayConfigBuilder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Load configuration from the environment.
    ///
    /// Unset variables fall back to their defaults; set but unparsable
    /// values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            host: env_or("SERVER_HOST", defaults.host)?,
            port: env_or("SERVER_PORT", defaults.port)?,
            guest_prefix: env_or("RELAY_GUEST_PREFIX", defaults.guest_prefix)?,
            staff_prefix: env_or("RELAY_STAFF_PREFIX", defaults.staff_prefix)?,
            pong_payload: env_or("RELAY_PONG_PAYLOAD", defaults.pong_payload)?,
            read_timeout_secs: env_or("RELAY_READ_TIMEOUT_SECS", defaults.read_timeout_secs)?,
            write_timeout_secs: env_or("RELAY_WRITE_TIMEOUT_SECS", defaults.write_timeout_secs)?,
            broker_buffer: env_or("RELAY_BROKER_BUFFER", defaults.broker_buffer)?,
            redis_url: std::env::var("RELAY_REDIS_URL")
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            redis_timeout_ms: env_or("RELAY_REDIS_TIMEOUT_MS", defaults.redis_timeout_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guest_prefix.is_empty() {
            return Err(ConfigError::MissingValue("guest_prefix"));
        }
        if self.staff_prefix.is_empty() {
            return Err(ConfigError::MissingValue("staff_prefix"));
        }
        if self.guest_prefix == self.staff_prefix {
            return Err(ConfigError::Invalid(format!(
                "guest and staff prefixes must differ (both '{}')",
                self.guest_prefix
            )));
        }
        if self.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid("read_timeout_secs must be positive".to_string()));
        }
        if self.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid("write_timeout_secs must be positive".to_string()));
        }
        if self.broker_buffer == 0 {
            return Err(ConfigError::Invalid("broker_buffer must be positive".to_string()));
        }
        if self.redis_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            return Err(ConfigError::MissingValue("redis_url"));
        }
        if self.redis_timeout_ms == 0 {
            return Err(ConfigError::Invalid("redis_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue {
            key: "SERVER_HOST",
            value: addr,
        })
    }

    /// Read deadline for socket frames
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Deadline for a single socket write
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Deadline for a single Redis command
    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

/// Builder for RelayConfig
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    /// Set the bind host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the bind port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the guest channel prefix
    pub fn guest_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.guest_prefix = prefix.into();
        self
    }

    /// Set the staff channel prefix
    pub fn staff_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.staff_prefix = prefix.into();
        self
    }

    /// Set the ping acknowledgment payload
    pub fn pong_payload(mut self, payload: impl Into<String>) -> Self {
        self.config.pong_payload = payload.into();
        self
    }

    /// Set the socket read deadline, in whole seconds
    pub fn read_timeout_secs(mut self, secs: u64) -> Self {
        self.config.read_timeout_secs = secs;
        self
    }

    /// Set the socket write deadline, in whole seconds
    pub fn write_timeout_secs(mut self, secs: u64) -> Self {
        self.config.write_timeout_secs = secs;
        self
    }

    /// Set the per-subscription delivery buffer
    pub fn broker_buffer(mut self, buffer: usize) -> Self {
        self.config.broker_buffer = buffer;
        self
    }

    /// Run on the Redis server at `url` instead of the in-process broker
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    /// Set the Redis command deadline
    pub fn redis_timeout(mut self, timeout: Duration) -> Self {
        self.config.redis_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
