use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelyError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8990;

pub const ENV_TIMELY_HOST: &str = "TIMELY_HOST";
pub const ENV_TIMELY_PORT: &str = "TIMELY_PORT";
pub const ENV_TIMELY_TIMEOUT_MS: &str = "TIMELY_TIMEOUT_MS";
pub const ENV_TIMELY_RECONNECT: &str = "TIMELY_RECONNECT";

/// Where and how to reach the store.
///
/// ```rust
/// use timely_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig {
///     port: 9000,
///     ..Default::default()
/// };
/// assert_eq!(config.address(), "127.0.0.1:9000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// Reopen the stream and retry once when a command hits a dead connection.
    pub reconnect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            read_timeout: None,
            reconnect: true,
        }
    }
}

impl ConnectionConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Defaults overlaid with the `TIMELY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for the `TIMELY_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_TIMELY_HOST).filter(|h| !h.is_empty()) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_TIMELY_PORT) {
            config.port = port.trim().parse().map_err(|_| {
                TimelyError::Config(format!("{ENV_TIMELY_PORT}={port} is not a valid port"))
            })?;
        }
        if let Some(timeout) = lookup(ENV_TIMELY_TIMEOUT_MS) {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                TimelyError::Config(format!(
                    "{ENV_TIMELY_TIMEOUT_MS}={timeout} is not a number of milliseconds"
                ))
            })?;
            let timeout = Some(Duration::from_millis(millis)).filter(|d| !d.is_zero());
            config.connect_timeout = timeout;
            config.read_timeout = timeout;
        }
        if let Some(reconnect) = lookup(ENV_TIMELY_RECONNECT) {
            config.reconnect = parse_flag(&reconnect).ok_or_else(|| {
                TimelyError::Config(format!(
                    "{ENV_TIMELY_RECONNECT}={reconnect} is not a boolean"
                ))
            })?;
        }

        log::debug!("connection config: {config:?}");
        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
