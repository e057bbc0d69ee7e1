//! Collector and MQTT listener settings, and inventory sync

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::{api_fail, api_ok};
use axum::{extract::State, Json};
use scada_core::api::{ApiResponse, MessageResponse, SyncResponse};
use scada_core::{CollectorConfig, Inventory, MqttSettings};
use tracing::{debug, info, warn};

/// Return collector.yaml, with defaults for missing sections.
///
/// # Endpoint
///
/// `GET /api/collector`
pub(crate) async fn get_collector(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CollectorConfig>>, ApiError> {
    debug!("Request: GET /api/collector");

    api_ok!(state.config.collector().load().await)
}

/// Replace collector.yaml.
///
/// Sections missing from the body are reset to their defaults. The MQTT
/// listener is restarted when the new mqtt section is enabled.
///
/// # Endpoint
///
/// `POST /api/collector`
pub(crate) async fn save_collector(
    State(state): State<AppState>,
    Json(config): Json<CollectorConfig>,
) -> Result<Json<ApiResponse<CollectorConfig>>, ApiError> {
    debug!("Request: POST /api/collector");

    state.config.collector().save(&config).await?;
    info!(
        "Collector config saved: {} (mqtt {})",
        config.collector.base_url(),
        if config.mqtt.enabled { "enabled" } else { "disabled" }
    );

    if config.mqtt.enabled {
        state.reload_mqtt().await;
    }

    api_ok!(config)
}

/// Replace the inventory with the collector's machines, PLCs and sensors.
///
/// # Endpoint
///
/// `POST /api/collector/sync`
///
/// # Errors
///
/// - `400` when no collector host is configured
/// - The collector's status when it rejects a request
pub(crate) async fn sync_inventory(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SyncResponse>>, ApiError> {
    debug!("Request: POST /api/collector/sync");

    let endpoint = state.config.collector().load().await.collector;
    if !endpoint.is_configured() {
        return api_fail!("Collector host not configured");
    }

    info!("Syncing inventory from {}...", endpoint.base_url());
    let timeout = state.request_timeout();

    let machines = state
        .collector
        .fetch_list(&endpoint, "/api/machines/", timeout)
        .await?;
    let plcs = state
        .collector
        .fetch_list(&endpoint, "/api/plcs/", timeout)
        .await?;
    let sensors = state
        .collector
        .fetch_list(&endpoint, "/api/sensors/", timeout)
        .await?;

    let inventory = Inventory {
        machines,
        plcs,
        sensors,
    };
    let counts = inventory.counts();
    state.config.inventory().save(&inventory).await?;

    info!(
        "Inventory synced: {} machines, {} PLCs, {} sensors",
        counts.machines, counts.plcs, counts.sensors
    );
    api_ok!(SyncResponse {
        counts,
        message: format!("Synced {} sensors", counts.sensors),
    })
}

/// Return the mqtt section of collector.yaml.
///
/// # Endpoint
///
/// `GET /api/mqtt/config`
pub(crate) async fn get_mqtt_config(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MqttSettings>>, ApiError> {
    debug!("Request: GET /api/mqtt/config");

    api_ok!(state.config.collector().load().await.mqtt)
}

/// Replace the mqtt section of collector.yaml and restart the listener.
///
/// # Endpoint
///
/// `POST /api/mqtt/config`
pub(crate) async fn save_mqtt_config(
    State(state): State<AppState>,
    Json(mqtt): Json<MqttSettings>,
) -> Result<Json<ApiResponse<MqttSettings>>, ApiError> {
    debug!("Request: POST /api/mqtt/config");

    let saved = mqtt.clone();
    state
        .config
        .collector()
        .update(|config| config.mqtt = mqtt)
        .await?;
    info!("MQTT config saved: {}", saved.broker_display());

    state.reload_mqtt().await;
    api_ok!(saved)
}

/// Restart the MQTT listener with the current settings.
///
/// # Endpoint
///
/// `POST /api/mqtt/reconnect`
pub(crate) async fn reconnect_mqtt(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    debug!("Request: POST /api/mqtt/reconnect");

    if state.reload_mqtt().await {
        api_ok!(MessageResponse::new("MQTT reconnection initiated"))
    } else {
        warn!("MQTT reconnect requested but no broker is enabled");
        api_ok!(MessageResponse::new("MQTT listener disabled: no enabled broker configured"))
    }
}
