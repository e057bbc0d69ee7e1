//! API models for the SCADA REST API
//!
//! This module contains request and response models shared by the server
//! and the CLI client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::config::InventoryCounts;

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success { data: T },
    #[serde(rename = "error")]
    Error { error: String },
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error response
    pub fn error(error: String) -> Self {
        Self::Error { error }
    }
}

/// Service identification returned by `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    /// Seconds since the server started
    pub uptime: u64,
    /// WebSocket path for live telemetry
    pub websocket: String,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Inventory counts and the last modification time of inventory.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    #[serde(flatten)]
    pub counts: InventoryCounts,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of an inventory sync from the collector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(flatten)]
    pub counts: InventoryCounts,
    pub message: String,
}

/// Outcome category of a connection probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Online,
    Reachable,
    AuthError,
    Error,
    Offline,
    Timeout,
    Unknown,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProbeStatus::Online => "online",
            ProbeStatus::Reachable => "reachable",
            ProbeStatus::AuthError => "auth_error",
            ProbeStatus::Error => "error",
            ProbeStatus::Offline => "offline",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Result of a collector, MQTT or database connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub success: bool,
    pub status: ProbeStatus,
    /// Round trip in milliseconds
    #[serde(rename = "latency", skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// HTTP status code returned by the probed service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Body returned by the probed service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProbeResult {
    /// A successful probe
    pub fn ok(status: ProbeStatus) -> Self {
        Self {
            success: true,
            status,
            latency_ms: None,
            code: None,
            error: None,
            message: None,
            data: None,
        }
    }

    /// A failed probe
    pub fn failed(status: ProbeStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            latency_ms: None,
            code: None,
            error: Some(error.into()),
            message: None,
            data: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Body of `POST /api/test/collector`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorTestRequest {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of `POST /api/test/mqtt`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttTestRequest {
    #[serde(default)]
    pub mqtt_host: String,
    #[serde(default)]
    pub mqtt_port: Option<u16>,
}

/// Body of `POST /api/test/database`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseTestRequest {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Live MQTT listener summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttSummary {
    pub status: ProbeStatus,
    pub connected: bool,
    pub broker: String,
    pub topic: String,
    pub machines: usize,
    pub sensors: usize,
    pub total_messages: u64,
    /// Seconds since the telemetry registry started
    pub uptime: u64,
}

/// Result of `GET /api/connection-status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub collector: ProbeResult,
    pub mqtt: MqttSummary,
    pub database: ProbeResult,
}

/// A machine seen on the MQTT bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMachine {
    pub code: String,
    pub plc_code: Option<String>,
    pub sensors: Vec<String>,
    pub sensor_count: usize,
    pub last_seen: DateTime<Utc>,
    pub message_count: u64,
    pub is_active: bool,
}

/// Totals over the connected machines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachinesSummary {
    pub total_machines: usize,
    pub active_machines: usize,
    pub total_sensors: usize,
    pub total_messages: u64,
    pub uptime: u64,
}

/// Result of `GET /api/machines/connected`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedMachinesResponse {
    pub machines: Vec<ConnectedMachine>,
    pub summary: MachinesSummary,
}

/// Message counters of the MQTT listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttCounters {
    pub machine_count: usize,
    pub sensor_count: usize,
    pub total_messages: u64,
    pub start_time: DateTime<Utc>,
    pub uptime: u64,
}

/// Result of `GET /api/mqtt/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttStatsResponse {
    pub connected: bool,
    pub broker: String,
    pub topic: String,
    pub machines: Vec<ConnectedMachine>,
    pub stats: MqttCounters,
}

/// Latest value published for a sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorValue {
    pub value: Value,
    pub unit: String,
    #[serde(rename = "machineCode")]
    pub machine_code: String,
    #[serde(rename = "plcCode")]
    pub plc_code: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub display_value: Option<Value>,
    pub raw_value: Option<Value>,
    /// Front-end highlight flag, always `false` when served
    #[serde(default)]
    pub flash: bool,
}

/// Result of `GET /api/sensors/values`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorValuesResponse {
    pub sensors: BTreeMap<String, SensorValue>,
    pub count: usize,
    pub timestamp: i64,
}

/// Result of `GET /api/sensors/history/:sensor_code`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorHistoryResponse {
    pub sensor_code: String,
    pub sensor_id: Value,
    pub sensor_name: Option<Value>,
    pub unit: Option<Value>,
    pub requested_hours: u32,
    /// Window start, ISO-8601 without zone suffix
    pub from: String,
    /// Window end, ISO-8601 without zone suffix
    pub to: String,
    pub history: Vec<Value>,
}

/// Result of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the collector answered
    pub remote: bool,
    pub local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields reported by the collector
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Result of `GET /api/version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    /// Local server version
    pub server: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Size and modification time of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStats {
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Local document statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStats {
    #[serde(flatten)]
    pub counts: InventoryCounts,
    pub files: BTreeMap<String, FileStats>,
}

/// Result of `GET /api/database/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseStatsResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Statistics reported by the collector's database endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<Value>,
    /// Entity counts reported by the collector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<InventoryCounts>,
    pub local: LocalStats,
}

/// Server identity part of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub platform: String,
    pub arch: String,
    pub hostname: String,
    pub uptime: u64,
    pub start_time: DateTime<Utc>,
}

/// Host metrics part of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub cpu_count: usize,
    pub cpu_usage: f32,
    pub cpu_model: String,
    pub total_memory: u64,
    pub free_memory: u64,
    pub used_memory: u64,
    pub memory_usage: f32,
    pub system_uptime: u64,
    pub load_average: [f64; 3],
}

/// Process metrics part of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub pid: u32,
    /// Resident set size in bytes
    pub rss: u64,
    /// Virtual memory in bytes
    #[serde(rename = "virtualMemory")]
    pub virtual_memory: u64,
}

/// MQTT part of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MqttStatus {
    #[serde(flatten)]
    pub summary: MqttSummary,
    pub messages_per_second: f64,
}

/// Database or collector part of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStatus {
    #[serde(flatten)]
    pub probe: ProbeResult,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Open client connections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCounts {
    pub websocket_clients: usize,
}

/// Result of `GET /api/server/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    pub server: ServerInfo,
    pub system: SystemMetrics,
    pub process: ProcessMetrics,
    pub mqtt: MqttStatus,
    pub database: EndpointStatus,
    pub collector: EndpointStatus,
    pub connections: ConnectionCounts,
}
