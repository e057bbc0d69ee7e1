//! HTTP client for communicating with the SCADA configuration server.

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use scada_core::api::{
    self, ConnectedMachinesResponse, ConnectionStatus, DatabaseStatsResponse, HealthResponse,
    InfoResponse, InventoryStats, MessageResponse, MqttStatsResponse, ProbeResult,
    SensorHistoryResponse, SensorValuesResponse, ServerStatus, SyncResponse, VersionResponse,
};
use scada_core::{
    CollectorConfig, DataConfig, DataConfigUpdate, InventoryUpdate, MachineLayout, MqttSettings,
    Record, SystemConfig,
};
use serde_json::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Normalize a server URL by removing trailing slashes.
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Percent-encode a path segment.
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// HTTP client for the SCADA server's REST API.
///
/// This client handles all HTTP communication with the server, including:
/// - Automatic retries on connection failures
/// - Timeout handling
/// - Decoding of the `{"status", "data" | "error"}` envelope
///
/// # Retry Logic
///
/// Requests that fail to reach the server (connection refused, timeout) are
/// retried with a delay that grows linearly with each attempt. Responses with
/// an error status are returned as errors without retrying.
///
/// # Examples
///
/// ```no_run
/// use scadactl::client::ScadaClient;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = ScadaClient::with_config(
///     "http://localhost:3002".to_string(),
///     10,  // timeout in seconds
///     3,   // max retries
///     Duration::from_millis(500),  // initial retry delay
/// )?;
///
/// let info = client.get_info().await?;
/// println!("Server version: {}", info.version);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ScadaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl ScadaClient {
    /// Create a new client.
    ///
    /// No request is made until the first call.
    ///
    /// # Arguments
    ///
    /// * `server_url` - Base URL of the server (e.g., "http://localhost:3002")
    /// * `timeout_secs` - Request timeout in seconds
    /// * `max_retries` - Maximum number of retry attempts for unreachable servers
    /// * `retry_delay` - Delay before the first retry
    pub fn with_config(
        server_url: String,
        timeout_secs: u64,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("scadactl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_url(&server_url),
            max_retries,
            retry_delay,
        })
    }

    /// Base URL of the server, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Process an HTTP response and extract the envelope's data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP status code indicates failure (4xx or 5xx)
    /// - The response body cannot be read or decoded
    /// - The envelope carries an error
    async fn handle_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", endpoint))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<api::ApiResponse<serde_json::Value>>(&text) {
                Ok(api::ApiResponse::Error { error }) => error,
                _ => text,
            };
            let error_msg = match status {
                StatusCode::NOT_FOUND => format!("Not found at {}: {}", endpoint, detail),
                StatusCode::BAD_REQUEST => format!("Bad request to {}: {}", endpoint, detail),
                StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
                    format!("Collector unavailable at {}: {}", endpoint, detail)
                }
                StatusCode::INTERNAL_SERVER_ERROR => {
                    format!("Server error at {}: {}", endpoint, detail)
                }
                _ => format!("HTTP {} error at {}: {}", status, endpoint, detail),
            };
            return Err(anyhow::anyhow!(error_msg));
        }

        let api_response: api::ApiResponse<T> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON response from {}", endpoint))?;

        match api_response {
            api::ApiResponse::Success { data } => Ok(data),
            api::ApiResponse::Error { error } => {
                Err(anyhow::anyhow!("Server error at {}: {}", endpoint, error))
            }
        }
    }

    /// Execute an HTTP request with automatic retry logic.
    ///
    /// Connection failures are always retried. Timeouts are retried only for
    /// `idempotent` requests, since a timed-out write may already have been
    /// applied. The delay before attempt `n` is `retry_delay * n`.
    async fn execute_with_retry<F, Fut, T>(
        &self,
        endpoint: &str,
        idempotent: bool,
        request_fn: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match request_fn().await {
                Ok(response) => return Self::handle_response(response, endpoint).await,
                Err(e) => {
                    let should_retry = e.is_connect() || (idempotent && e.is_timeout());
                    if attempt < self.max_retries && should_retry {
                        attempt += 1;
                        tokio::time::sleep(self.retry_delay * attempt).await;
                        continue;
                    }
                    return Err(anyhow::anyhow!(
                        "Failed to reach {} after {} attempt(s): {}",
                        endpoint,
                        attempt + 1,
                        e
                    ));
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.execute_with_retry(path, true, || self.client.get(&url).send())
            .await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.execute_with_retry(path, false, || {
            self.client.post(&url).json(body).send()
        })
        .await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.execute_with_retry(path, false, || {
            self.client.put(&url).json(body).send()
        })
        .await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        self.execute_with_retry(path, false, || self.client.delete(&url).send())
            .await
    }

    /// Service name, version and uptime.
    pub async fn get_info(&self) -> Result<InfoResponse> {
        self.get("/").await
    }

    /// Collector health merged with local status.
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/api/health").await
    }

    /// Collector and server versions.
    pub async fn version(&self) -> Result<VersionResponse> {
        self.get("/api/version").await
    }

    /// Host metrics and the state of every connection.
    pub async fn server_status(&self) -> Result<ServerStatus> {
        self.get("/api/server/status").await
    }

    /// Collector, MQTT and database reachability.
    pub async fn connection_status(&self) -> Result<ConnectionStatus> {
        self.get("/api/connection-status").await
    }

    /// Database statistics reported through the collector.
    pub async fn database_stats(&self) -> Result<DatabaseStatsResponse> {
        self.get("/api/database/stats").await
    }

    // System configuration

    pub async fn get_config(&self) -> Result<SystemConfig> {
        self.get("/api/config").await
    }

    pub async fn list_backends(&self) -> Result<Vec<Record>> {
        self.get("/api/backends").await
    }

    /// Add a backend, or replace the one with the same `id`.
    ///
    /// # Errors
    ///
    /// Returns an error without contacting the server when `id` is missing.
    pub async fn upsert_backend(&self, backend: &Record) -> Result<Record> {
        if backend.id_string().map_or(true, |id| id.trim().is_empty()) {
            return Err(anyhow::anyhow!("Backend id cannot be empty"));
        }
        self.post("/api/backends", backend).await
    }

    pub async fn delete_backend(&self, id: &str) -> Result<MessageResponse> {
        self.delete(&format!("/api/backends/{}", segment(id))).await
    }

    pub async fn list_metrics(&self) -> Result<Vec<Record>> {
        self.get("/api/dashboard/metrics").await
    }

    pub async fn add_metric(&self, metric: &Record) -> Result<Record> {
        self.post("/api/dashboard/metrics", metric).await
    }

    pub async fn update_metric(&self, id: &str, patch: &Record) -> Result<Record> {
        self.put(&format!("/api/dashboard/metrics/{}", segment(id)), patch)
            .await
    }

    pub async fn delete_metric(&self, id: &str) -> Result<MessageResponse> {
        self.delete(&format!("/api/dashboard/metrics/{}", segment(id)))
            .await
    }

    /// Widget layout for a machine, falling back to the default layout.
    pub async fn get_layout(&self, machine_id: &str) -> Result<MachineLayout> {
        self.get(&format!("/api/layouts/{}", segment(machine_id)))
            .await
    }

    // Inventory

    pub async fn list_plcs(&self) -> Result<Vec<Record>> {
        self.get("/api/plcs").await
    }

    pub async fn list_sensors(&self) -> Result<Vec<Record>> {
        self.get("/api/sensors").await
    }

    pub async fn update_plc(&self, id: &str, patch: &Record) -> Result<Record> {
        self.put(&format!("/api/plcs/{}", segment(id)), patch).await
    }

    pub async fn update_sensor(&self, id: &str, patch: &Record) -> Result<Record> {
        self.put(&format!("/api/sensors/{}", segment(id)), patch).await
    }

    pub async fn inventory_stats(&self) -> Result<InventoryStats> {
        self.get("/api/inventory/stats").await
    }

    /// Replace the lists present in `update`; absent lists are kept.
    pub async fn save_inventory(&self, update: &InventoryUpdate) -> Result<MessageResponse> {
        self.post("/api/inventory/save", update).await
    }

    /// Replace the local inventory with the collector's.
    pub async fn sync_inventory(&self) -> Result<SyncResponse> {
        self.post("/api/collector/sync", &serde_json::json!({}))
            .await
    }

    // Collector and data-source settings

    pub async fn get_collector(&self) -> Result<CollectorConfig> {
        self.get("/api/collector").await
    }

    pub async fn save_collector(&self, config: &CollectorConfig) -> Result<CollectorConfig> {
        self.post("/api/collector", config).await
    }

    pub async fn get_mqtt_config(&self) -> Result<MqttSettings> {
        self.get("/api/mqtt/config").await
    }

    pub async fn save_mqtt_config(&self, mqtt: &MqttSettings) -> Result<MqttSettings> {
        self.post("/api/mqtt/config", mqtt).await
    }

    /// Restart the server's MQTT listener.
    pub async fn reconnect_mqtt(&self) -> Result<MessageResponse> {
        self.post("/api/mqtt/reconnect", &serde_json::json!({}))
            .await
    }

    pub async fn get_data_config(&self) -> Result<DataConfig> {
        self.get("/api/data-config").await
    }

    /// Save data-source settings; the server fills in defaults.
    pub async fn save_data_config(&self, update: &DataConfigUpdate) -> Result<DataConfig> {
        self.post("/api/data-config", update).await
    }

    // Connection tests

    pub async fn test_collector(
        &self,
        host: &str,
        port: Option<u16>,
        token: Option<&str>,
    ) -> Result<ProbeResult> {
        let body = api::CollectorTestRequest {
            host: host.to_string(),
            port,
            token: token.map(str::to_string),
        };
        self.post("/api/test/collector", &body).await
    }

    pub async fn test_mqtt(&self, host: &str, port: Option<u16>) -> Result<ProbeResult> {
        let body = api::MqttTestRequest {
            mqtt_host: host.to_string(),
            mqtt_port: port,
        };
        self.post("/api/test/mqtt", &body).await
    }

    pub async fn test_database(&self, host: &str, port: Option<u16>) -> Result<ProbeResult> {
        let body = api::DatabaseTestRequest {
            host: host.to_string(),
            port,
        };
        self.post("/api/test/database", &body).await
    }

    // Collector proxy

    /// Machines as listed by the collector.
    pub async fn list_machines(&self) -> Result<Value> {
        self.get("/api/machines").await
    }

    pub async fn get_machine(&self, id: &str) -> Result<Value> {
        self.get(&format!("/api/machines/{}", segment(id))).await
    }

    /// MQTT topic mapping from the collector, filtered by `query` pairs.
    pub async fn mqtt_topics(&self, query: &[(&str, &str)]) -> Result<Value> {
        let mut path = "/api/sensors/mqtt-topics".to_string();
        let pairs: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", segment(k), segment(v)))
            .collect();
        if !pairs.is_empty() {
            path.push('?');
            path.push_str(&pairs.join("&"));
        }
        self.get(&path).await
    }

    // Live telemetry

    pub async fn connected_machines(&self) -> Result<ConnectedMachinesResponse> {
        self.get("/api/machines/connected").await
    }

    pub async fn sensor_values(&self) -> Result<SensorValuesResponse> {
        self.get("/api/sensors/values").await
    }

    pub async fn mqtt_stats(&self) -> Result<MqttStatsResponse> {
        self.get("/api/mqtt/stats").await
    }

    /// Readings of a sensor over the last `hours` hours.
    pub async fn sensor_history(&self, code: &str, hours: u32) -> Result<SensorHistoryResponse> {
        self.get(&format!(
            "/api/sensors/history/{}?hours={}",
            segment(code),
            hours
        ))
        .await
    }
}
