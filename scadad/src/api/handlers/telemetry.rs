//! Live telemetry from the MQTT listener: REST views and the WebSocket feed

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use crate::telemetry::TelemetryMessage;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Json,
};
use scada_core::api::{
    ApiResponse, ConnectedMachinesResponse, MqttStatsResponse, SensorValuesResponse,
};
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Machines seen on the MQTT bus, most recent first.
///
/// # Endpoint
///
/// `GET /api/machines/connected`
pub(crate) async fn connected_machines(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ConnectedMachinesResponse>>, ApiError> {
    debug!("Request: GET /api/machines/connected");

    api_ok!(state.telemetry.connected_machines().await)
}

/// Listener state and message counters.
///
/// # Endpoint
///
/// `GET /api/mqtt/stats`
pub(crate) async fn mqtt_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MqttStatsResponse>>, ApiError> {
    debug!("Request: GET /api/mqtt/stats");

    let status = state.mqtt.status().await;
    let machines = state.telemetry.machines().await;
    let stats = state.telemetry.counters().await;

    api_ok!(MqttStatsResponse {
        connected: status.connected,
        broker: status.broker,
        topic: status.topic,
        machines,
        stats,
    })
}

/// Latest value of every sensor.
///
/// # Endpoint
///
/// `GET /api/sensors/values`
pub(crate) async fn sensor_values(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SensorValuesResponse>>, ApiError> {
    debug!("Request: GET /api/sensors/values");

    api_ok!(state.telemetry.sensor_values().await)
}

/// WebSocket feed of every MQTT message as `{"topic", "payload"}`.
///
/// # Endpoint
///
/// `GET /mqtt-ws`
pub(crate) async fn mqtt_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let receiver = state.broadcaster.subscribe();
        info!(
            "WebSocket client connected ({} total)",
            state.broadcaster.client_count()
        );
        forward_telemetry(socket, receiver).await;
        info!("WebSocket client disconnected");
    })
}

fn greeting() -> String {
    json!({"type": "connected", "message": "Connected to MQTT Proxy"}).to_string()
}

async fn forward_telemetry(
    mut socket: WebSocket,
    mut receiver: broadcast::Receiver<TelemetryMessage>,
) {
    if socket.send(Message::Text(greeting())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            message = receiver.recv() => match message {
                Ok(message) => {
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode telemetry message: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagging, skipped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_greeting() {
        let greeting: Value = serde_json::from_str(&greeting()).unwrap();
        assert_eq!(greeting["type"], "connected");
        assert_eq!(greeting["message"], "Connected to MQTT Proxy");
    }
}
