//! Runtime configuration management
//!
//! Combines the static configuration with the YAML documents, each of which
//! is read from disk on every access and written independently.

use scada_core::{
    api::LocalStats, CollectorConfig, DataConfig, Inventory, Result, ScadaError, StaticConfig,
    SystemConfig,
};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::info;

use super::YamlDocument;

/// Runtime configuration combining static config and the YAML documents.
///
/// Static config is read once at startup and remains immutable. The documents
/// are not cached: every request sees the file as it is on disk, so edits made
/// by hand are picked up without a restart.
pub(crate) struct RuntimeConfig {
    /// Static configuration (immutable after load)
    static_config: StaticConfig,

    /// Backends, dashboard metrics, layouts (`config.yaml`)
    system: YamlDocument<SystemConfig>,

    /// Machines, PLCs, sensors (`inventory.yaml`)
    inventory: YamlDocument<Inventory>,

    /// Collector endpoint and MQTT listener (`collector.yaml`)
    collector: YamlDocument<CollectorConfig>,

    /// Data-source settings used by the proxy (`data.yaml`)
    data: YamlDocument<DataConfig>,
}

impl RuntimeConfig {
    /// Load configuration from disk.
    ///
    /// If the config file doesn't exist, creates it with defaults.
    /// If the data directory doesn't exist, creates it.
    /// Missing documents are created with their defaults; existing ones are
    /// left untouched even if they fail to parse.
    pub async fn load(config_path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", config_path.display());

        let static_config = Self::load_static_config(config_path).await?;
        Self::ensure_data_dir(&static_config.data_dir).await?;

        let config = Self::from_static(static_config);
        config.system.ensure_exists().await?;
        config.inventory.ensure_exists().await?;
        config.collector.ensure_exists().await?;
        config.data.ensure_exists().await?;

        let counts = config.inventory.load().await.counts();
        info!(
            "Configuration loaded: {} machines, {} PLCs, {} sensors",
            counts.machines, counts.plcs, counts.sensors
        );

        Ok(config)
    }

    /// Build the runtime configuration without touching the disk.
    pub fn from_static(static_config: StaticConfig) -> Self {
        let dir = static_config.data_dir.clone();
        Self {
            system: YamlDocument::new(dir.join("config.yaml"), "config"),
            inventory: YamlDocument::new(dir.join("inventory.yaml"), "inventory"),
            collector: YamlDocument::new(dir.join("collector.yaml"), "collector config"),
            data: YamlDocument::new(dir.join("data.yaml"), "data config"),
            static_config,
        }
    }

    /// Load static config from TOML file, creating with defaults if missing.
    async fn load_static_config(path: &Path) -> Result<StaticConfig> {
        if !path.exists() {
            info!(
                "Static config not found at {}. Creating with defaults.",
                path.display()
            );

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ScadaError::Config(format!(
                        "Failed to create config directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }

            let config = StaticConfig::default();
            let toml_str = config
                .to_toml()
                .map_err(|e| ScadaError::Config(format!("Failed to serialize config: {}", e)))?;

            fs::write(path, &toml_str)
                .await
                .map_err(|e| ScadaError::Config(format!("Failed to write config file: {}", e)))?;

            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ScadaError::Config(format!("Failed to read config file: {}", e)))?;

        StaticConfig::from_toml(&content)
            .map_err(|e| ScadaError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Ensure data directory exists and is writable.
    async fn ensure_data_dir(data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            info!("Creating data directory: {}", data_dir.display());
            fs::create_dir_all(data_dir).await.map_err(|e| {
                ScadaError::Config(format!(
                    "Failed to create data directory '{}': {}. \
                     Please create it manually or check permissions.",
                    data_dir.display(),
                    e
                ))
            })?;
        }

        let test_file = data_dir.join(".write_test");
        fs::write(&test_file, "test").await.map_err(|e| {
            ScadaError::Config(format!(
                "Data directory '{}' is not writable: {}",
                data_dir.display(),
                e
            ))
        })?;
        let _ = fs::remove_file(&test_file).await;

        Ok(())
    }

    /// Get reference to static configuration.
    pub fn static_config(&self) -> &StaticConfig {
        &self.static_config
    }

    /// Get data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.static_config.data_dir
    }

    /// The system configuration document.
    pub fn system(&self) -> &YamlDocument<SystemConfig> {
        &self.system
    }

    /// The inventory document.
    pub fn inventory(&self) -> &YamlDocument<Inventory> {
        &self.inventory
    }

    /// The collector document.
    pub fn collector(&self) -> &YamlDocument<CollectorConfig> {
        &self.collector
    }

    /// The data-source document.
    pub fn data_config(&self) -> &YamlDocument<DataConfig> {
        &self.data
    }

    /// Local inventory counts and document file statistics.
    pub async fn local_stats(&self) -> LocalStats {
        let counts = self.inventory.load().await.counts();
        let mut files = BTreeMap::new();

        if let Some(stats) = self.inventory.metadata().await {
            files.insert("inventory".to_string(), stats);
        }
        if let Some(stats) = self.system.metadata().await {
            files.insert("config".to_string(), stats);
        }
        if let Some(stats) = self.collector.metadata().await {
            files.insert("collector".to_string(), stats);
        }
        if let Some(stats) = self.data.metadata().await {
            files.insert("data".to_string(), stats);
        }

        LocalStats { counts, files }
    }
}
