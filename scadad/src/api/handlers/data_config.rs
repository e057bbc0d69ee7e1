//! Data-source settings handlers (`data.yaml`)

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{extract::State, Json};
use scada_core::api::ApiResponse;
use scada_core::{DataConfig, DataConfigUpdate};
use tracing::{debug, info};

/// Return the data-source settings.
///
/// # Endpoint
///
/// `GET /api/data-config`
pub(crate) async fn get_data_config(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DataConfig>>, ApiError> {
    debug!("Request: GET /api/data-config");

    api_ok!(state.config.data_config().load().await)
}

/// Validate, complete and persist the data-source settings.
///
/// Missing fields take their defaults; MQTT and database hosts default to
/// the collector host. Restarts the MQTT listener when MQTT is enabled.
///
/// # Endpoint
///
/// `POST /api/data-config`
///
/// # Validation Rules
///
/// - `collector.host` is required
pub(crate) async fn save_data_config(
    State(state): State<AppState>,
    Json(update): Json<DataConfigUpdate>,
) -> Result<Json<ApiResponse<DataConfig>>, ApiError> {
    debug!("Request: POST /api/data-config");

    let config = DataConfig::from_update(update)?;
    state.config.data_config().save(&config).await?;
    info!(
        "Data config saved: collector {}, mqtt {}, database {}:{}",
        config.collector.base_url(),
        config.mqtt.broker_display(),
        config.database.host,
        config.database.port
    );

    if config.mqtt.enabled {
        state.reload_mqtt().await;
    }

    api_ok!(config)
}

#[cfg(test)]
mod integration_tests {
    use crate::api::testing::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_returns_defaults() {
        let app = TestApp::new().await;
        tokio::fs::remove_file(app.state.config.data_config().path())
            .await
            .unwrap();

        let (status, body) = app.get("/api/data-config").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["collector"]["host"], "10.147.18.10");
        assert_eq!(body["data"]["database"]["name"], "industrial");
    }

    #[tokio::test]
    async fn test_save_requires_collector_host() {
        let app = TestApp::new().await;
        let before = app.state.config.data_config().load().await;

        let (status, body) = app
            .post("/api/data-config", json!({"collector": {"port": 8000}}))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Collector host is required");
        assert_eq!(app.state.config.data_config().load().await, before);
    }

    #[tokio::test]
    async fn test_save_fills_defaults() {
        let app = TestApp::new().await;

        let (status, body) = app
            .post(
                "/api/data-config",
                json!({"collector": {"host": "127.0.0.1"}, "mqtt": {"enabled": false}}),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["collector"]["port"], 8000);
        assert_eq!(body["data"]["mqtt"]["mqtt_host"], "127.0.0.1");
        assert_eq!(body["data"]["database"]["host"], "127.0.0.1");

        let saved = app.state.config.data_config().load().await;
        assert_eq!(saved.database.driver, "postgresql+asyncpg");
        assert!(!saved.mqtt.enabled);
    }
}
