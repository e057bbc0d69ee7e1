//! Root endpoint

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;

use axum::{extract::State, Json};
use scada_core::api::{ApiResponse, InfoResponse};
use tracing::debug;

/// Handle the root endpoint.
///
/// Provide basic service identification. Useful for health checks and
/// verifying the API is accessible.
///
/// # Endpoint
///
/// `GET /`
///
/// # Returns
///
/// Service name, version, uptime in seconds and the WebSocket path of the
/// live telemetry feed.
pub(crate) async fn root(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoResponse>>, ApiError> {
    debug!("Request: GET /");

    api_ok!(InfoResponse {
        name: "SCADA Configuration Server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        websocket: "/mqtt-ws".to_string(),
    })
}

#[cfg(test)]
mod integration_tests {
    use crate::api::testing::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_root() {
        let app = TestApp::new().await;

        let (status, body) = app.get("/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["websocket"], "/mqtt-ws");
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = TestApp::new().await;
        let (status, _) = app.get("/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
