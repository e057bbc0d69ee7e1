//! SCADA Core Library
//!
//! Shared document types, configuration models, API models and the client
//! authentication service. This crate is used by both the server and CLI
//! components.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthError, AuthService, AuthState, AuthUser, Credentials, Role, SessionStorage};
pub use config::{
    default_config_path, default_data_dir, default_session_path, CollectorConfig,
    CollectorEndpoint, DataConfig, DataConfigUpdate, Inventory, InventoryCounts, InventoryUpdate,
    MachineLayout, MqttSettings, StaticConfig, SystemConfig,
};
pub use error::*;
pub use types::*;
