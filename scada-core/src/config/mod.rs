//! Configuration types for the SCADA server
//!
//! # Architecture
//!
//! Configuration is split into:
//! - [`StaticConfig`] - Server settings, loaded once at startup (TOML)
//! - [`SystemConfig`] - Backends, dashboard metrics and layouts (`config.yaml`)
//! - [`Inventory`] - Machines, PLCs and sensors (`inventory.yaml`)
//! - [`CollectorConfig`] - Collector endpoint and MQTT listener (`collector.yaml`)
//! - [`DataConfig`] - Data-source settings used by the proxy (`data.yaml`)
//!
//! Each YAML document lives in its own file within the data directory.

mod collector;
mod data_config;
mod inventory;
mod paths;
mod static_config;
mod system_config;

pub use collector::{
    parse_broker_url, CollectorConfig, CollectorEndpoint, MqttSettings, DEFAULT_COLLECTOR_PORT,
    DEFAULT_MQTT_PORT,
};
pub use data_config::{
    CollectorUpdate, DataConfig, DataConfigUpdate, DatabaseSettings, DatabaseUpdate, MqttUpdate,
    DEFAULT_DATABASE_PORT,
};
pub use inventory::{Inventory, InventoryCounts, InventoryUpdate};
pub use paths::{default_config_path, default_data_dir, default_session_path};
pub use static_config::{
    CollectorTimeouts, ServerConfig, StaticConfig, TelemetryConfig, DEFAULT_PORT,
};
pub use system_config::{Dashboards, MachineLayout, SystemConfig, DEFAULT_LAYOUT};
