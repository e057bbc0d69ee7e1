//! Connection tests, connection summary and server status

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::diagnostics::{collect_host_metrics, probe_mqtt, probe_tcp};
use crate::{api_fail, api_ok};
use axum::{extract::State, Json};
use scada_core::api::{
    ApiResponse, CollectorTestRequest, ConnectionCounts, ConnectionStatus, DatabaseTestRequest,
    EndpointStatus, MqttStatus, MqttTestRequest, ProbeResult, ProbeStatus, ServerInfo,
    ServerStatus,
};
use scada_core::config::{DEFAULT_COLLECTOR_PORT, DEFAULT_DATABASE_PORT, DEFAULT_MQTT_PORT};
use scada_core::CollectorEndpoint;
use tracing::{debug, info};

/// Port 0 and a missing port both select `default`.
fn port_or(port: Option<u16>, default: u16) -> u16 {
    port.filter(|p| *p != 0).unwrap_or(default)
}

/// Probe a collector's `/api/health` with the given credentials.
///
/// # Endpoint
///
/// `POST /api/test/collector`
///
/// # Validation Rules
///
/// - `host` is required; `port` defaults to 8000
pub(crate) async fn test_collector(
    State(state): State<AppState>,
    Json(request): Json<CollectorTestRequest>,
) -> Result<Json<ApiResponse<ProbeResult>>, ApiError> {
    debug!("Request: POST /api/test/collector");

    if request.host.trim().is_empty() {
        return api_fail!("Host is required");
    }

    let endpoint = CollectorEndpoint {
        host: request.host,
        port: port_or(request.port, DEFAULT_COLLECTOR_PORT),
        token: request.token.unwrap_or_default(),
        enabled: true,
    };
    info!("Testing collector connection to {}...", endpoint.base_url());

    let probe = state
        .collector
        .probe_health(&endpoint, state.probe_timeout())
        .await;
    api_ok!(probe)
}

/// Try an MQTT handshake with a broker.
///
/// # Endpoint
///
/// `POST /api/test/mqtt`
///
/// # Validation Rules
///
/// - `mqtt_host` is required; `mqtt_port` defaults to 1883
pub(crate) async fn test_mqtt(
    State(state): State<AppState>,
    Json(request): Json<MqttTestRequest>,
) -> Result<Json<ApiResponse<ProbeResult>>, ApiError> {
    debug!("Request: POST /api/test/mqtt");

    if request.mqtt_host.trim().is_empty() {
        return api_fail!("MQTT host is required");
    }

    let port = port_or(request.mqtt_port, DEFAULT_MQTT_PORT);
    info!("Testing MQTT connection to mqtt://{}:{}...", request.mqtt_host, port);

    let probe = probe_mqtt(request.mqtt_host.trim(), port, state.probe_timeout()).await;
    api_ok!(probe)
}

/// Check that the database port accepts TCP connections.
///
/// Credentials are not verified.
///
/// # Endpoint
///
/// `POST /api/test/database`
///
/// # Validation Rules
///
/// - `host` is required; `port` defaults to 5432
pub(crate) async fn test_database(
    State(state): State<AppState>,
    Json(request): Json<DatabaseTestRequest>,
) -> Result<Json<ApiResponse<ProbeResult>>, ApiError> {
    debug!("Request: POST /api/test/database");

    if request.host.trim().is_empty() {
        return api_fail!("Database host is required");
    }

    let port = port_or(request.port, DEFAULT_DATABASE_PORT);
    info!("Testing database connection to {}:{}...", request.host, port);

    let probe = probe_tcp(request.host.trim(), port, state.probe_timeout()).await;
    api_ok!(probe)
}

/// Status of the collector, MQTT listener and database from data.yaml.
///
/// # Endpoint
///
/// `GET /api/connection-status`
pub(crate) async fn connection_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ConnectionStatus>>, ApiError> {
    debug!("Request: GET /api/connection-status");

    let config = state.config.data_config().load().await;
    let timeout = state.status_timeout();
    let database_port = port_or(Some(config.database.port), DEFAULT_DATABASE_PORT);

    let (collector, database, mqtt) = tokio::join!(
        state.collector.probe_health(&config.collector, timeout),
        probe_tcp(&config.database.host, database_port, timeout),
        state.mqtt.summary(),
    );

    api_ok!(ConnectionStatus {
        collector,
        mqtt,
        database,
    })
}

/// Server identity, host metrics and the state of every connection.
///
/// # Endpoint
///
/// `GET /api/server/status`
pub(crate) async fn server_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ServerStatus>>, ApiError> {
    debug!("Request: GET /api/server/status");

    let config = state.config.data_config().load().await;
    let timeout = state.status_timeout();
    let database_port = port_or(Some(config.database.port), DEFAULT_DATABASE_PORT);

    let (host, collector_probe, database_probe, summary) = tokio::join!(
        collect_host_metrics(),
        state.collector.probe_health(&config.collector, timeout),
        probe_tcp(&config.database.host, database_port, timeout),
        state.mqtt.summary(),
    );

    let uptime = state.start_time.elapsed().as_secs();
    let messages_per_second = if uptime > 0 {
        (summary.total_messages as f64 / uptime as f64 * 10.0).round() / 10.0
    } else {
        0.0
    };

    // An open database port counts as online here.
    let mut database_probe = database_probe;
    if database_probe.status == ProbeStatus::Reachable {
        database_probe.status = ProbeStatus::Online;
        database_probe.message = None;
    }

    api_ok!(ServerStatus {
        server: ServerInfo {
            name: "SCADA Configuration Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            hostname: host.hostname,
            uptime,
            start_time: state.telemetry.start_time(),
        },
        system: host.system,
        process: host.process,
        mqtt: MqttStatus {
            summary,
            messages_per_second,
        },
        database: EndpointStatus {
            probe: database_probe,
            host: config.database.host,
            port: database_port,
            enabled: None,
            name: Some(config.database.name),
            user: Some(config.database.user),
        },
        collector: EndpointStatus {
            probe: collector_probe,
            host: config.collector.host,
            port: config.collector.port,
            enabled: Some(config.collector.enabled),
            name: None,
            user: None,
        },
        connections: ConnectionCounts {
            websocket_clients: state.broadcaster.client_count(),
        },
    })
}

#[cfg(test)]
mod integration_tests {
    use super::port_or;
    use crate::api::testing::{closed_port, spawn_collector, TestApp};
    use scada_core::config::{DEFAULT_COLLECTOR_PORT, DEFAULT_DATABASE_PORT, DEFAULT_MQTT_PORT};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_hosts_are_rejected() {
        let app = TestApp::new().await;

        let (status, body) = app.post("/api/test/collector", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Host is required");

        let (status, body) = app.post("/api/test/mqtt", json!({"mqtt_port": 1883})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MQTT host is required");

        let (status, body) = app.post("/api/test/database", json!({"host": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Database host is required");
    }

    #[tokio::test]
    async fn test_collector_online() {
        let endpoint = spawn_collector(
            Router::new().route("/api/health", get(|| async { Json(json!({"status": "ok"})) })),
        )
        .await;
        let app = TestApp::new().await;

        let (status, body) = app
            .post(
                "/api/test/collector",
                json!({"host": endpoint.host, "port": endpoint.port}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], true);
        assert_eq!(body["data"]["status"], "online");
        assert_eq!(body["data"]["data"]["status"], "ok");
        assert!(body["data"]["latency"].is_u64());
    }

    #[tokio::test]
    async fn test_collector_auth_error() {
        let endpoint = spawn_collector(Router::new().route(
            "/api/health",
            get(|| async { (StatusCode::UNAUTHORIZED, "denied") }),
        ))
        .await;
        let app = TestApp::new().await;

        let (_, body) = app
            .post(
                "/api/test/collector",
                json!({"host": endpoint.host, "port": endpoint.port, "token": "bad"}),
            )
            .await;

        assert_eq!(body["data"]["success"], false);
        assert_eq!(body["data"]["status"], "auth_error");
    }

    #[tokio::test]
    async fn test_collector_offline() {
        let app = TestApp::new().await;

        let (status, body) = app
            .post(
                "/api/test/collector",
                json!({"host": "127.0.0.1", "port": closed_port()}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "offline");
    }

    #[tokio::test]
    async fn test_database_reachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let app = TestApp::new().await;

        let (_, body) = app
            .post("/api/test/database", json!({"host": "127.0.0.1", "port": port}))
            .await;

        assert_eq!(body["data"]["success"], true);
        assert_eq!(body["data"]["status"], "reachable");
        assert!(body["data"]["message"]
            .as_str()
            .unwrap()
            .contains(&port.to_string()));
    }

    #[test]
    fn test_zero_port_selects_default() {
        assert_eq!(port_or(None, DEFAULT_MQTT_PORT), 1883);
        assert_eq!(port_or(Some(0), DEFAULT_MQTT_PORT), 1883);
        assert_eq!(port_or(Some(0), DEFAULT_DATABASE_PORT), 5432);
        assert_eq!(port_or(Some(0), DEFAULT_COLLECTOR_PORT), DEFAULT_COLLECTOR_PORT);
        assert_eq!(port_or(Some(15432), DEFAULT_DATABASE_PORT), 15432);
    }

    #[tokio::test]
    async fn test_database_zero_port_uses_default() {
        // Either this listener or whatever already holds the port accepts.
        let _listener = tokio::net::TcpListener::bind(("127.0.0.1", DEFAULT_DATABASE_PORT))
            .await
            .ok();
        let app = TestApp::new().await;

        let (_, body) = app
            .post("/api/test/database", json!({"host": "127.0.0.1", "port": 0}))
            .await;

        assert_eq!(body["data"]["success"], true);
        assert!(body["data"]["message"].as_str().unwrap().contains("Port 5432"));
    }

    #[tokio::test]
    async fn test_mqtt_unreachable_broker() {
        let app = TestApp::new().await;

        let (status, body) = app
            .post(
                "/api/test/mqtt",
                json!({"mqtt_host": "127.0.0.1", "mqtt_port": closed_port()}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], false);
    }

    #[tokio::test]
    async fn test_connection_status_offline() {
        let app = TestApp::new().await;

        let (status, body) = app.get("/api/connection-status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["collector"]["status"], "offline");
        assert_eq!(body["data"]["mqtt"]["status"], "offline");
        assert_eq!(body["data"]["mqtt"]["totalMessages"], 0);
        assert_eq!(body["data"]["database"]["success"], false);
    }

    #[tokio::test]
    async fn test_server_status() {
        let app = TestApp::new().await;

        let (status, body) = app.get("/api/server/status").await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["server"]["name"], "SCADA Configuration Server");
        assert!(data["system"]["cpuCount"].as_u64().unwrap() > 0);
        assert_eq!(data["process"]["pid"], std::process::id());
        assert_eq!(data["mqtt"]["connected"], false);
        assert_eq!(data["mqtt"]["messagesPerSecond"], 0.0);
        assert_eq!(data["collector"]["enabled"], true);
        assert_eq!(data["database"]["host"], "127.0.0.1");
        assert_eq!(data["connections"]["websocketClients"], 0);
    }
}
