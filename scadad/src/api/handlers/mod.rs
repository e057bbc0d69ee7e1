//! API request handlers for the SCADA server REST API.
//!
//! This module organizes all HTTP endpoint handlers into logical groups:
//!
//! # Handler Modules
//!
//! - [`info`] - Root endpoint
//! - [`system`] - Backends, dashboard metrics and layouts (`config.yaml`)
//! - [`inventory`] - PLCs and sensors (`inventory.yaml`)
//! - [`collector`] - Collector and MQTT listener settings (`collector.yaml`)
//! - [`data_config`] - Data-source settings (`data.yaml`)
//! - [`proxy`] - Requests relayed to the external collector
//! - [`diagnostics`] - Connection tests and server status
//! - [`telemetry`] - Live MQTT data and the WebSocket feed
//!
//! # API Structure
//!
//! All handlers follow a consistent pattern:
//! - Accept `State<AppState>` for accessing shared application state
//! - Return `Result<Json<ApiResponse<T>>, ApiError>` for uniform responses
//! - Use `api_ok!()` and `api_fail!()` macros for response construction
//! - Log operations using the `tracing` crate
//!
//! Documents are read from disk on every request; writes go through the
//! document's writer lock.

pub mod collector;
pub mod data_config;
pub mod diagnostics;
pub mod info;
pub mod inventory;
pub mod proxy;
pub mod system;
pub mod telemetry;
