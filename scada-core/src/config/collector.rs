//! Collector connection and MQTT listener settings
//!
//! Stored in `{data_dir}/collector.yaml`. The same section shapes are reused
//! by the data-source settings in `data.yaml`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Port used when a collector endpoint does not specify one.
pub const DEFAULT_COLLECTOR_PORT: u16 = 8000;

/// Port used when an MQTT broker does not specify one.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// HTTP endpoint of the external collector service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorEndpoint {
    pub host: String,
    pub port: u16,
    /// Bearer token; empty means no `Authorization` header
    pub token: String,
    pub enabled: bool,
}

impl Default for CollectorEndpoint {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_COLLECTOR_PORT,
            token: String::new(),
            enabled: false,
        }
    }
}

impl CollectorEndpoint {
    /// Whether a host has been configured.
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }

    /// Base URL of the collector, `http://{host}:{port}`.
    ///
    /// A zero port is treated as unset.
    pub fn base_url(&self) -> String {
        let port = if self.port == 0 {
            DEFAULT_COLLECTOR_PORT
        } else {
            self.port
        };
        format!("http://{}:{}", self.host.trim(), port)
    }

    /// The bearer token, if one is set.
    pub fn bearer_token(&self) -> Option<&str> {
        let token = self.token.trim();
        (!token.is_empty()).then_some(token)
    }
}

/// MQTT broker subscription settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub broker_url: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub topic: String,
    pub enabled: bool,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker_url: String::new(),
            mqtt_host: String::new(),
            mqtt_port: DEFAULT_MQTT_PORT,
            topic: "plc/#".to_string(),
            enabled: false,
        }
    }
}

impl MqttSettings {
    /// Broker host and port.
    ///
    /// `mqtt_host`/`mqtt_port` take precedence; otherwise the host and port
    /// are parsed out of `broker_url` (`mqtt://host:port`).
    pub fn broker_address(&self) -> Option<(String, u16)> {
        let port = if self.mqtt_port == 0 {
            DEFAULT_MQTT_PORT
        } else {
            self.mqtt_port
        };

        let host = self.mqtt_host.trim();
        if !host.is_empty() {
            return Some((host.to_string(), port));
        }

        parse_broker_url(&self.broker_url)
    }

    /// Display form of the broker, `mqtt://host:port`.
    pub fn broker_display(&self) -> String {
        match self.broker_address() {
            Some((host, port)) => format!("mqtt://{}:{}", host, port),
            None => self.broker_url.clone(),
        }
    }
}

/// Parse `mqtt://host:port` (scheme and port optional).
pub fn parse_broker_url(url: &str) -> Option<(String, u16)> {
    let rest = url.trim();
    let rest = rest
        .split_once("://")
        .map(|(_, after)| after)
        .unwrap_or(rest);
    let rest = rest.split('/').next().unwrap_or_default();

    if rest.is_empty() {
        return None;
    }

    match rest.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port = port.parse().ok()?;
            Some((host.to_string(), port))
        }
        Some(_) => None,
        None => Some((rest.to_string(), DEFAULT_MQTT_PORT)),
    }
}

/// Collector document stored in collector.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub collector: CollectorEndpoint,
    #[serde(default)]
    pub mqtt: MqttSettings,
    /// Other sections are preserved across writes
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
