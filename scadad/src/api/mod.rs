//! API module for the SCADA server
//!
//! Contains the REST API implementation with Axum router and handlers.

pub(crate) mod handlers;

#[cfg(test)]
pub(crate) mod testing;

use crate::collector::CollectorClient;
use crate::config::RuntimeConfig;
use crate::telemetry::{MqttSupervisor, TelemetryBroadcaster, TelemetryRegistry};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Runtime configuration (static config + YAML documents)
    pub config: Arc<RuntimeConfig>,
    /// HTTP client for the external collector
    pub collector: CollectorClient,
    /// Machines and sensors seen on the MQTT bus
    pub telemetry: Arc<TelemetryRegistry>,
    /// Fan-out of MQTT messages to WebSocket clients
    pub broadcaster: TelemetryBroadcaster,
    /// MQTT listener task
    pub mqtt: Arc<MqttSupervisor>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: RuntimeConfig) -> scada_core::Result<Self> {
        let telemetry_config = &config.static_config().telemetry;
        let telemetry = Arc::new(TelemetryRegistry::new(Duration::from_secs(
            telemetry_config.active_window_secs,
        )));
        let broadcaster = TelemetryBroadcaster::new(telemetry_config.channel_capacity);
        let mqtt = Arc::new(MqttSupervisor::new(telemetry.clone(), broadcaster.clone()));

        Ok(Self {
            config: Arc::new(config),
            collector: CollectorClient::new()?,
            telemetry,
            broadcaster,
            mqtt,
            start_time: Instant::now(),
        })
    }

    /// Timeout for proxied collector requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.static_config().server.request_timeout_secs)
    }

    /// Timeout for explicit connection tests.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.config.static_config().collector.probe_timeout_secs)
    }

    /// Timeout for sensor history requests.
    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.config.static_config().collector.history_timeout_secs)
    }

    /// Timeout for the probes behind the status endpoints.
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.config.static_config().collector.status_timeout_secs)
    }

    /// Restart the MQTT listener from the documents on disk.
    pub async fn reload_mqtt(&self) -> bool {
        self.mqtt.reload(&self.config).await
    }
}

/// Create the main API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024)); // 1MB limit

    Router::new()
        // System configuration (config.yaml)
        .route("/api/config", get(handlers::system::get_config))
        .route(
            "/api/backends",
            get(handlers::system::list_backends).post(handlers::system::upsert_backend),
        )
        .route(
            "/api/backends/:id",
            axum::routing::delete(handlers::system::delete_backend),
        )
        .route(
            "/api/dashboard/metrics",
            get(handlers::system::list_metrics).post(handlers::system::add_metric),
        )
        .route(
            "/api/dashboard/metrics/:id",
            put(handlers::system::update_metric).delete(handlers::system::delete_metric),
        )
        .route("/api/layouts/:machine_id", get(handlers::system::get_layout))
        // Inventory (inventory.yaml)
        .route("/api/plcs", get(handlers::inventory::list_plcs))
        .route("/api/plcs/:id", put(handlers::inventory::update_plc))
        .route("/api/sensors", get(handlers::inventory::list_sensors))
        .route("/api/sensors/:id", put(handlers::inventory::update_sensor))
        .route(
            "/api/inventory/save",
            post(handlers::inventory::save_inventory),
        )
        .route(
            "/api/inventory/stats",
            get(handlers::inventory::inventory_stats),
        )
        // Collector settings (collector.yaml)
        .route(
            "/api/collector",
            get(handlers::collector::get_collector).post(handlers::collector::save_collector),
        )
        .route(
            "/api/collector/sync",
            post(handlers::collector::sync_inventory),
        )
        .route(
            "/api/mqtt/config",
            get(handlers::collector::get_mqtt_config).post(handlers::collector::save_mqtt_config),
        )
        .route(
            "/api/mqtt/reconnect",
            post(handlers::collector::reconnect_mqtt),
        )
        // Data-source settings (data.yaml)
        .route(
            "/api/data-config",
            get(handlers::data_config::get_data_config)
                .post(handlers::data_config::save_data_config),
        )
        // Collector proxy
        .route("/api/machines", get(handlers::proxy::list_machines))
        .route("/api/machines/:id", get(handlers::proxy::get_machine))
        .route(
            "/api/sensors/mqtt-topics",
            get(handlers::proxy::mqtt_topics),
        )
        .route(
            "/api/sensors/history/:sensor_code",
            get(handlers::proxy::sensor_history),
        )
        .route("/api/health", get(handlers::proxy::health))
        .route("/api/version", get(handlers::proxy::version))
        .route("/api/database/stats", get(handlers::proxy::database_stats))
        // Diagnostics
        .route(
            "/api/test/collector",
            post(handlers::diagnostics::test_collector),
        )
        .route("/api/test/mqtt", post(handlers::diagnostics::test_mqtt))
        .route(
            "/api/test/database",
            post(handlers::diagnostics::test_database),
        )
        .route(
            "/api/connection-status",
            get(handlers::diagnostics::connection_status),
        )
        .route(
            "/api/server/status",
            get(handlers::diagnostics::server_status),
        )
        // Live telemetry
        .route(
            "/api/machines/connected",
            get(handlers::telemetry::connected_machines),
        )
        .route("/api/mqtt/stats", get(handlers::telemetry::mqtt_stats))
        .route(
            "/api/sensors/values",
            get(handlers::telemetry::sensor_values),
        )
        .route("/mqtt-ws", get(handlers::telemetry::mqtt_ws))
        // Root endpoint
        .route("/", get(handlers::info::root))
        .layer(middleware_stack)
        .with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use scada_core::api::ApiResponse;
    use scada_core::ScadaError;

    use tracing::error;

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
    }

    impl ApiError {
        /// Create a new API error
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
            }
        }

        /// Create a bad request error
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Create a not found error
        pub fn not_found(message: impl Into<String>) -> Self {
            Self::new(StatusCode::NOT_FOUND, message)
        }

        /// Create an internal server error
        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }

        /// Create a bad gateway error (collector unreachable or unusable)
        pub fn bad_gateway(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_GATEWAY, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            error!("API Error {}: {}", self.status_code, self.message);

            let response: ApiResponse<()> = ApiResponse::error(self.message);

            (self.status_code, Json(response)).into_response()
        }
    }

    /// Convert ScadaError to ApiError
    impl From<ScadaError> for ApiError {
        fn from(err: ScadaError) -> Self {
            match err {
                ScadaError::InvalidInput(msg) => Self::bad_request(msg),
                ScadaError::NotFound { .. } => Self::not_found(err.to_string()),
                ScadaError::Upstream { status, message } => Self::new(
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    message,
                ),
                ScadaError::Collector(msg) => Self::bad_gateway(msg),
                ScadaError::Timeout(msg) => Self::new(StatusCode::GATEWAY_TIMEOUT, msg),
                _ => Self::internal_error(err.to_string()),
            }
        }
    }

}

/// Helper macros for common responses
#[macro_export]
macro_rules! api_ok {
    ($data:expr) => {
        Ok(axum::Json(scada_core::api::ApiResponse::success($data)))
    };
}

#[macro_export]
macro_rules! api_fail {
    ($message:expr) => {
        Err($crate::api::error::ApiError::bad_request($message))
    };
}
