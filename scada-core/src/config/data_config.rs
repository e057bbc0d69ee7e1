//! Persistent data-source settings: collector API, MQTT broker, database
//!
//! Stored in `{data_dir}/data.yaml`. These settings drive the collector
//! proxy and the connection diagnostics.

use serde::{Deserialize, Serialize};

use super::collector::{CollectorEndpoint, MqttSettings, DEFAULT_COLLECTOR_PORT, DEFAULT_MQTT_PORT};
use crate::error::{Result, ScadaError};

/// Host used for every data source until one is configured.
pub const DEFAULT_DATA_HOST: &str = "10.147.18.10";

/// Default PostgreSQL port.
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Database connection parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub driver: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_DATA_HOST.to_string(),
            port: DEFAULT_DATABASE_PORT,
            user: "backend".to_string(),
            password: "backend_pass".to_string(),
            name: "industrial".to_string(),
            driver: "postgresql+asyncpg".to_string(),
        }
    }
}

/// Data-source document stored in data.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub collector: CollectorEndpoint,
    pub mqtt: MqttSettings,
    pub database: DatabaseSettings,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            collector: CollectorEndpoint {
                host: DEFAULT_DATA_HOST.to_string(),
                port: DEFAULT_COLLECTOR_PORT,
                token: String::new(),
                enabled: true,
            },
            mqtt: MqttSettings {
                broker_url: format!("mqtt://{}:{}", DEFAULT_DATA_HOST, DEFAULT_MQTT_PORT),
                mqtt_host: DEFAULT_DATA_HOST.to_string(),
                mqtt_port: DEFAULT_MQTT_PORT,
                topic: "machines/#".to_string(),
                enabled: true,
            },
            database: DatabaseSettings::default(),
        }
    }
}

/// Collector section of a data-config update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
    pub enabled: Option<bool>,
}

/// MQTT section of a data-config update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttUpdate {
    pub broker_url: Option<String>,
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub topic: Option<String>,
    pub enabled: Option<bool>,
}

/// Database section of a data-config update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub driver: Option<String>,
}

/// Body of a data-config save: every field optional, blanks mean "use default".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfigUpdate {
    #[serde(default)]
    pub collector: Option<CollectorUpdate>,
    #[serde(default)]
    pub mqtt: Option<MqttUpdate>,
    #[serde(default)]
    pub database: Option<DatabaseUpdate>,
}

fn text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn port(value: Option<u16>) -> Option<u16> {
    value.filter(|p| *p != 0)
}

impl DataConfig {
    /// Build a complete configuration from an update.
    ///
    /// `collector.host` is required. Missing MQTT and database hosts fall
    /// back to the collector host; every other missing field takes its
    /// default. Empty strings and zero ports count as missing.
    pub fn from_update(update: DataConfigUpdate) -> Result<Self> {
        let collector = update.collector.unwrap_or_default();
        let host = text(collector.host)
            .ok_or_else(|| ScadaError::InvalidInput("Collector host is required".to_string()))?;

        let mqtt = update.mqtt.unwrap_or_default();
        let database = update.database.unwrap_or_default();
        let defaults = DatabaseSettings::default();

        Ok(Self {
            collector: CollectorEndpoint {
                host: host.clone(),
                port: port(collector.port).unwrap_or(DEFAULT_COLLECTOR_PORT),
                token: collector.token.unwrap_or_default(),
                enabled: collector.enabled.unwrap_or(true),
            },
            mqtt: MqttSettings {
                broker_url: text(mqtt.broker_url)
                    .unwrap_or_else(|| format!("mqtt://{}:{}", host, DEFAULT_MQTT_PORT)),
                mqtt_host: text(mqtt.mqtt_host).unwrap_or_else(|| host.clone()),
                mqtt_port: port(mqtt.mqtt_port).unwrap_or(DEFAULT_MQTT_PORT),
                topic: text(mqtt.topic).unwrap_or_else(|| "machines/#".to_string()),
                enabled: mqtt.enabled.unwrap_or(true),
            },
            database: DatabaseSettings {
                host: text(database.host).unwrap_or(host),
                port: port(database.port).unwrap_or(DEFAULT_DATABASE_PORT),
                user: text(database.user).unwrap_or(defaults.user),
                password: text(database.password).unwrap_or(defaults.password),
                name: text(database.name).unwrap_or(defaults.name),
                driver: text(database.driver).unwrap_or(defaults.driver),
            },
        })
    }
}
