//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::paths::default_data_dir;

/// Default server port (shared by REST API and WebSocket).
pub const DEFAULT_PORT: u16 = 3002;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind hostname
    pub hostname: String,
    /// Bind port
    pub port: u16,
    /// Timeout for proxied collector requests, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            request_timeout_secs: 10,
        }
    }
}

/// Timeouts used when talking to the collector outside of plain proxying
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorTimeouts {
    /// Connection tests (collector, MQTT, database), in seconds
    pub probe_timeout_secs: u64,
    /// Sensor history queries, in seconds
    pub history_timeout_secs: u64,
    /// Status/statistics lookups, in seconds
    pub status_timeout_secs: u64,
}

impl Default for CollectorTimeouts {
    fn default() -> Self {
        Self {
            probe_timeout_secs: 5,
            history_timeout_secs: 30,
            status_timeout_secs: 3,
        }
    }
}

/// Live telemetry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// A machine counts as active if it published within this window
    pub active_window_secs: u64,
    /// Capacity of the WebSocket fan-out channel
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            active_window_secs: 30,
            channel_capacity: 1024,
        }
    }
}

/// Static configuration for the SCADA daemon.
///
/// Located at `~/.config/scada/server.toml` by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Server configuration (hostname, port, timeout)
    #[serde(default)]
    pub server: ServerConfig,

    /// Collector timeouts
    #[serde(default)]
    pub collector: CollectorTimeouts,

    /// Telemetry settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Directory for the YAML documents (config, inventory, collector, data)
    ///
    /// Defaults to `~/.local/share/scada` (XDG data directory).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            collector: CollectorTimeouts::default(),
            telemetry: TelemetryConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl StaticConfig {
    /// Create a new StaticConfig with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
