//! Test utilities for CLI testing
//!
//! Provides an in-process mock of the SCADA server for client tests.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use scada_core::api::{ApiResponse, InfoResponse, InventoryStats, MessageResponse};
use scada_core::config::MqttSettings;
use scada_core::{InventoryCounts, Record};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Mock server state
#[derive(Debug, Clone)]
pub struct MockServerState {
    pub backends: Arc<Mutex<Vec<Record>>>,
    pub plcs: Arc<Mutex<Vec<Record>>>,
    pub sensors: Arc<Mutex<Vec<Record>>>,
    pub metrics: Arc<Mutex<Vec<Record>>>,
    /// Number of `GET /api/dashboard/metrics` requests received
    pub metric_reads: Arc<AtomicUsize>,
    /// Delay applied by the dashboard metric handlers before replying
    pub delay: Duration,
}

fn record(value: serde_json::Value) -> Record {
    serde_json::from_value(value).unwrap()
}

impl Default for MockServerState {
    fn default() -> Self {
        Self {
            backends: Arc::new(Mutex::new(Vec::new())),
            plcs: Arc::new(Mutex::new(vec![record(
                json!({"id": 7, "code": "PLC-7", "ip": "10.0.0.7"}),
            )])),
            sensors: Arc::new(Mutex::new(vec![record(
                json!({"id": "s1", "code": "TEMP-1", "unit": "C"}),
            )])),
            metrics: Arc::new(Mutex::new(Vec::new())),
            metric_reads: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }
}

/// Mock server implementation
#[derive(Debug)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Create a new mock server
    pub fn new() -> Self {
        Self {
            state: MockServerState::default(),
            port: 0, // Will be assigned when server starts
        }
    }

    /// Delay replies of the dashboard metric handlers
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.state.delay = delay;
        self
    }

    /// Start the mock server and return the address
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok((self, server_url))
    }

    /// Get the server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &MockServerState {
        &self.state
    }

    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(info_handler))
            .route(
                "/api/backends",
                get(list_backends_handler).post(upsert_backend_handler),
            )
            .route(
                "/api/backends/:id",
                axum::routing::delete(delete_backend_handler),
            )
            .route(
                "/api/dashboard/metrics",
                get(list_metrics_handler).post(add_metric_handler),
            )
            .route("/api/plcs", get(list_plcs_handler))
            .route("/api/plcs/:id", put(update_plc_handler))
            .route("/api/sensors", get(list_sensors_handler))
            .route("/api/inventory/stats", get(inventory_stats_handler))
            .route("/api/machines", get(list_machines_handler))
            .route("/api/machines/:id", get(get_machine_handler))
            .route("/api/sensors/mqtt-topics", get(mqtt_topics_handler))
            .route("/api/mqtt/config", get(mqtt_config_handler))
            .with_state(self.state.clone())
    }
}

// Handler functions

async fn info_handler() -> Json<ApiResponse<InfoResponse>> {
    Json(ApiResponse::success(InfoResponse {
        name: "SCADA Configuration Server".to_string(),
        version: "0.0.0-test".to_string(),
        uptime: 42,
        websocket: "/mqtt-ws".to_string(),
    }))
}

async fn list_backends_handler(
    State(state): State<MockServerState>,
) -> Json<ApiResponse<Vec<Record>>> {
    Json(ApiResponse::success(state.backends.lock().unwrap().clone()))
}

async fn upsert_backend_handler(
    State(state): State<MockServerState>,
    Json(backend): Json<Record>,
) -> Json<ApiResponse<Record>> {
    let mut backends = state.backends.lock().unwrap();
    let id = backend.id_string().unwrap_or_default();
    backends.retain(|b| !b.id_matches(&id));
    backends.push(backend.clone());
    Json(ApiResponse::success(backend))
}

async fn delete_backend_handler(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<MessageResponse>> {
    state.backends.lock().unwrap().retain(|b| !b.id_matches(&id));
    Json(ApiResponse::success(MessageResponse::new(format!(
        "Backend '{}' removed",
        id
    ))))
}

async fn list_metrics_handler(
    State(state): State<MockServerState>,
) -> Json<ApiResponse<Vec<Record>>> {
    state.metric_reads.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.delay).await;
    Json(ApiResponse::success(state.metrics.lock().unwrap().clone()))
}

async fn add_metric_handler(
    State(state): State<MockServerState>,
    Json(metric): Json<Record>,
) -> Json<ApiResponse<Record>> {
    state.metrics.lock().unwrap().push(metric.clone());
    tokio::time::sleep(state.delay).await;
    Json(ApiResponse::success(metric))
}

async fn list_plcs_handler(State(state): State<MockServerState>) -> Json<ApiResponse<Vec<Record>>> {
    Json(ApiResponse::success(state.plcs.lock().unwrap().clone()))
}

async fn list_sensors_handler(
    State(state): State<MockServerState>,
) -> Json<ApiResponse<Vec<Record>>> {
    Json(ApiResponse::success(state.sensors.lock().unwrap().clone()))
}

async fn update_plc_handler(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
    Json(patch): Json<Record>,
) -> (StatusCode, Json<ApiResponse<Record>>) {
    let mut plcs = state.plcs.lock().unwrap();
    match plcs.iter_mut().find(|plc| plc.id_matches(&id)) {
        Some(plc) => {
            plc.merge(patch);
            (StatusCode::OK, Json(ApiResponse::success(plc.clone())))
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("PLC not found: {}", id))),
        ),
    }
}

async fn inventory_stats_handler(
    State(state): State<MockServerState>,
) -> Json<ApiResponse<InventoryStats>> {
    Json(ApiResponse::success(InventoryStats {
        counts: InventoryCounts {
            machines: 0,
            plcs: state.plcs.lock().unwrap().len(),
            sensors: state.sensors.lock().unwrap().len(),
        },
        last_modified: Some(Utc::now()),
    }))
}

fn machines() -> Value {
    json!([
        {"id": "PRESS-1", "name": "Press 1"},
        {"id": "LATHE-2", "name": "Lathe 2"}
    ])
}

async fn list_machines_handler() -> Json<ApiResponse<Value>> {
    Json(ApiResponse::success(machines()))
}

async fn get_machine_handler(Path(id): Path<String>) -> (StatusCode, Json<ApiResponse<Value>>) {
    let found = machines()
        .as_array()
        .and_then(|list| list.iter().find(|m| m["id"] == id.as_str()).cloned());
    match found {
        Some(machine) => (StatusCode::OK, Json(ApiResponse::success(machine))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Machine not found: {}", id))),
        ),
    }
}

async fn mqtt_topics_handler(
    Query(params): Query<BTreeMap<String, String>>,
) -> Json<ApiResponse<Value>> {
    let topics = vec![
        json!({"machine": "PRESS-1", "topic": "plc/PRESS-1/TEMP-1"}),
        json!({"machine": "LATHE-2", "topic": "plc/LATHE-2/RPM-1"}),
    ];
    let filtered: Vec<Value> = match params.get("machine") {
        Some(machine) => topics
            .into_iter()
            .filter(|t| t["machine"] == machine.as_str())
            .collect(),
        None => topics,
    };
    Json(ApiResponse::success(Value::Array(filtered)))
}

async fn mqtt_config_handler() -> Json<ApiResponse<MqttSettings>> {
    Json(ApiResponse::success(MqttSettings {
        mqtt_host: "broker.local".to_string(),
        ..MqttSettings::default()
    }))
}
