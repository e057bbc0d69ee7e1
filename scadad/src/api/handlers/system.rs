//! System configuration handlers: backends, dashboard metrics and layouts

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{
    extract::{Path, State},
    Json,
};
use scada_core::api::{ApiResponse, MessageResponse};
use scada_core::{MachineLayout, Record, ScadaError, SystemConfig};
use tracing::{debug, info};

/// Return the whole system configuration document.
///
/// # Endpoint
///
/// `GET /api/config`
pub(crate) async fn get_config(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SystemConfig>>, ApiError> {
    debug!("Request: GET /api/config");

    api_ok!(state.config.system().load().await)
}

/// List configured backends.
///
/// # Endpoint
///
/// `GET /api/backends`
pub(crate) async fn list_backends(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Record>>>, ApiError> {
    debug!("Request: GET /api/backends");

    api_ok!(state.config.system().load().await.backends)
}

/// Add a backend, or replace the one with the same `id`.
///
/// # Endpoint
///
/// `POST /api/backends`
///
/// # Validation Rules
///
/// - The body must be an object with an `id` field
pub(crate) async fn upsert_backend(
    State(state): State<AppState>,
    Json(backend): Json<Record>,
) -> Result<Json<ApiResponse<Record>>, ApiError> {
    debug!("Request: POST /api/backends");

    let saved = state
        .config
        .system()
        .try_update(|config| config.upsert_backend(backend).cloned())
        .await?;

    info!("Saved backend {}", saved.id_string().unwrap_or_default());
    api_ok!(saved)
}

/// Remove a backend by id. Removing an unknown backend is not an error.
///
/// # Endpoint
///
/// `DELETE /api/backends/:id`
pub(crate) async fn delete_backend(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    debug!("Request: DELETE /api/backends/{}", id);

    let removed = state
        .config
        .system()
        .update(|config| config.remove_backend(&id))
        .await?;

    if removed {
        info!("Removed backend {}", id);
    }
    api_ok!(MessageResponse::new(format!("Backend '{}' removed", id)))
}

/// List dashboard metric definitions.
///
/// # Endpoint
///
/// `GET /api/dashboard/metrics`
pub(crate) async fn list_metrics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Record>>>, ApiError> {
    debug!("Request: GET /api/dashboard/metrics");

    api_ok!(state.config.system().load().await.dashboards.metrics)
}

/// Append a dashboard metric.
///
/// # Endpoint
///
/// `POST /api/dashboard/metrics`
pub(crate) async fn add_metric(
    State(state): State<AppState>,
    Json(metric): Json<Record>,
) -> Result<Json<ApiResponse<Record>>, ApiError> {
    debug!("Request: POST /api/dashboard/metrics");

    let saved = metric.clone();
    state
        .config
        .system()
        .update(|config| config.add_metric(metric))
        .await?;

    info!("Added dashboard metric {}", saved.id_string().unwrap_or_default());
    api_ok!(saved)
}

/// Merge fields into an existing dashboard metric.
///
/// # Endpoint
///
/// `PUT /api/dashboard/metrics/:id`
///
/// # Errors
///
/// - `404` when no metric has the given id
pub(crate) async fn update_metric(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Record>,
) -> Result<Json<ApiResponse<Record>>, ApiError> {
    debug!("Request: PUT /api/dashboard/metrics/{}", id);

    let updated = state
        .config
        .system()
        .try_update(|config| {
            config
                .update_metric(&id, patch)
                .cloned()
                .ok_or_else(|| ScadaError::not_found("Metric", id.as_str()))
        })
        .await?;

    info!("Updated dashboard metric {}", id);
    api_ok!(updated)
}

/// Remove a dashboard metric by id.
///
/// # Endpoint
///
/// `DELETE /api/dashboard/metrics/:id`
pub(crate) async fn delete_metric(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    debug!("Request: DELETE /api/dashboard/metrics/{}", id);

    let removed = state
        .config
        .system()
        .update(|config| config.remove_metric(&id))
        .await?;

    if removed {
        info!("Removed dashboard metric {}", id);
    }
    api_ok!(MessageResponse::new(format!("Metric '{}' removed", id)))
}

/// Resolve the widget layout for a machine.
///
/// Falls back to the `default` layout; every widget carries the requested
/// `machineId`.
///
/// # Endpoint
///
/// `GET /api/layouts/:machine_id`
///
/// # Errors
///
/// - `404` when neither a machine layout nor a default layout exists
pub(crate) async fn get_layout(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
) -> Result<Json<ApiResponse<MachineLayout>>, ApiError> {
    debug!("Request: GET /api/layouts/{}", machine_id);

    match state.config.system().load().await.layout_for(&machine_id) {
        Some(layout) => api_ok!(layout),
        None => Err(ApiError::not_found("Layout not found")),
    }
}

#[cfg(test)]
mod integration_tests {
    use crate::api::testing::TestApp;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_backend_upsert_and_delete() {
        let app = TestApp::new().await;

        let (status, body) = app
            .post("/api/backends", json!({"id": "b1", "name": "Line 1"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Line 1");

        app.post("/api/backends", json!({"id": "b1", "name": "Line 1b"}))
            .await;
        let (_, body) = app.get("/api/backends").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Line 1b");

        let (status, _) = app.delete("/api/backends/b1").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.get("/api/backends").await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_backend_without_id_is_rejected() {
        let app = TestApp::new().await;

        let (status, body) = app.post("/api/backends", json!({"name": "x"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(!app.state.config.system().path().exists());
    }

    #[tokio::test]
    async fn test_metric_lifecycle() {
        let app = TestApp::new().await;

        app.post("/api/dashboard/metrics", json!({"id": "m1", "label": "Temp"}))
            .await;

        let (status, body) = app
            .put("/api/dashboard/metrics/m1", json!({"label": "Temperature", "unit": "C"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"id": "m1", "label": "Temperature", "unit": "C"}));

        let (status, _) = app
            .put("/api/dashboard/metrics/missing", json!({"label": "x"}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.delete("/api/dashboard/metrics/m1").await;
        let (_, body) = app.get("/api/dashboard/metrics").await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_layout_fallback_and_not_found() {
        let app = TestApp::new().await;

        let (status, _) = app.get("/api/layouts/PRESS-1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        app.state
            .config
            .system()
            .update(|config| {
                config.layouts = serde_json::from_value(json!({
                    "default": {"widgets": [{"type": "gauge"}]}
                }))
                .unwrap();
            })
            .await
            .unwrap();

        let (status, body) = app.get("/api/layouts/PRESS-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["machineId"], "PRESS-1");
        assert_eq!(body["data"]["widgets"][0]["machineId"], "PRESS-1");
    }

    #[tokio::test]
    async fn test_get_config_defaults() {
        let app = TestApp::new().await;

        let (status, body) = app.get("/api/config").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["backends"], json!([]));
        assert_eq!(body["data"]["dashboards"]["metrics"], json!([]));
    }
}
