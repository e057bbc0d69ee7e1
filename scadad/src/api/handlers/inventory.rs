//! Inventory handlers: PLCs, sensors and bulk saves

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{
    extract::{Path, State},
    Json,
};
use scada_core::api::{ApiResponse, InventoryStats, MessageResponse};
use scada_core::{InventoryUpdate, Record, ScadaError};
use tracing::{debug, info};

/// List PLCs from the local inventory.
///
/// # Endpoint
///
/// `GET /api/plcs`
pub(crate) async fn list_plcs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Record>>>, ApiError> {
    debug!("Request: GET /api/plcs");

    api_ok!(state.config.inventory().load().await.plcs)
}

/// List sensors from the local inventory.
///
/// # Endpoint
///
/// `GET /api/sensors`
pub(crate) async fn list_sensors(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Record>>>, ApiError> {
    debug!("Request: GET /api/sensors");

    api_ok!(state.config.inventory().load().await.sensors)
}

/// Merge fields into a PLC.
///
/// The id matches numeric and string ids alike (`7` matches `"7"`).
///
/// # Endpoint
///
/// `PUT /api/plcs/:id`
///
/// # Errors
///
/// - `404` when no PLC has the given id
pub(crate) async fn update_plc(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Record>,
) -> Result<Json<ApiResponse<Record>>, ApiError> {
    debug!("Request: PUT /api/plcs/{}", id);

    let updated = state
        .config
        .inventory()
        .try_update(|inventory| {
            inventory
                .update_plc(&id, patch)
                .cloned()
                .ok_or_else(|| ScadaError::not_found("PLC", id.as_str()))
        })
        .await?;

    info!("Updated PLC {}", id);
    api_ok!(updated)
}

/// Merge fields into a sensor.
///
/// # Endpoint
///
/// `PUT /api/sensors/:id`
///
/// # Errors
///
/// - `404` when no sensor has the given id
pub(crate) async fn update_sensor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Record>,
) -> Result<Json<ApiResponse<Record>>, ApiError> {
    debug!("Request: PUT /api/sensors/{}", id);

    let updated = state
        .config
        .inventory()
        .try_update(|inventory| {
            inventory
                .update_sensor(&id, patch)
                .cloned()
                .ok_or_else(|| ScadaError::not_found("Sensor", id.as_str()))
        })
        .await?;

    info!("Updated sensor {}", id);
    api_ok!(updated)
}

/// Replace the inventory lists present in the body, keeping the others.
///
/// # Endpoint
///
/// `POST /api/inventory/save`
pub(crate) async fn save_inventory(
    State(state): State<AppState>,
    Json(update): Json<InventoryUpdate>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    debug!("Request: POST /api/inventory/save");

    let counts = state
        .config
        .inventory()
        .update(|inventory| {
            inventory.merge_save(update);
            inventory.counts()
        })
        .await?;

    info!(
        "Inventory saved: {} PLCs, {} sensors",
        counts.plcs, counts.sensors
    );
    api_ok!(MessageResponse::new(format!(
        "Saved {} PLCs and {} sensors",
        counts.plcs, counts.sensors
    )))
}

/// Inventory counts and the modification time of inventory.yaml.
///
/// # Endpoint
///
/// `GET /api/inventory/stats`
pub(crate) async fn inventory_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InventoryStats>>, ApiError> {
    debug!("Request: GET /api/inventory/stats");

    let inventory = state.config.inventory();
    let counts = inventory.load().await.counts();
    let last_modified = inventory.metadata().await.and_then(|stats| stats.modified);

    api_ok!(InventoryStats {
        counts,
        last_modified,
    })
}
