//! Gateway configuration, loaded from a TOML file.
//!
//! Every section is optional and falls back to defaults suitable for a
//! local development setup (broker on localhost, 60 s relay windows).

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Bind address for the device-facing server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

/// MQTT broker connection for the relay publisher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Topic aggregated records are published to.
    #[serde(default = "default_topic")]
    pub topic: String,
}

/// Windowing and queueing parameters for the relay path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Length of one per-device aggregation window, seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Capacity of each inbox queue (storage and relay).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// Installation site geometry used for sun tracking until an operator
/// issues a location command.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Local UTC offset in minutes.
    #[serde(default)]
    pub timezone_offset_minutes: i32,
}

fn default_bind() -> SocketAddr {
    // Default CoAP port kept from the original deployment.
    "0.0.0.0:5683".parse().unwrap_or(SocketAddr::from(([0, 0, 0, 0], 5683)))
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "sungate".to_string()
}

fn default_topic() -> String {
    "sensors".to_string()
}

fn default_window_secs() -> u64 {
    60
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            client_id: default_client_id(),
            topic: default_topic(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}
