//! Requests relayed to the external collector
//!
//! The collector endpoint and bearer token come from data.yaml, except for
//! the database statistics which use the collector configured in
//! collector.yaml. A non-success answer from the collector is relayed with
//! its status code.

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use scada_core::api::{
    ApiResponse, DatabaseStatsResponse, HealthResponse, SensorHistoryResponse, VersionResponse,
};
use scada_core::{value_key, CollectorEndpoint, InventoryCounts, ScadaError};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// History window used when `hours` is missing or invalid.
const DEFAULT_HISTORY_HOURS: u32 = 24;

/// Timestamp format sent to the collector: ISO-8601 without a zone suffix.
const COLLECTOR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

async fn data_collector(state: &AppState) -> CollectorEndpoint {
    state.config.data_config().load().await.collector
}

/// List machines from the collector.
///
/// # Endpoint
///
/// `GET /api/machines`
pub(crate) async fn list_machines(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /api/machines");

    let endpoint = data_collector(&state).await;
    let machines = state
        .collector
        .get_json(&endpoint, "/api/machines/", &[], state.request_timeout())
        .await?;

    api_ok!(machines)
}

/// Fetch a single machine from the collector.
///
/// # Endpoint
///
/// `GET /api/machines/:id`
pub(crate) async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /api/machines/{}", id);

    let endpoint = data_collector(&state).await;
    let path = format!("/api/machines/{}", urlencoding::encode(&id));
    let machine = state
        .collector
        .get_json(&endpoint, &path, &[], state.request_timeout())
        .await?;

    api_ok!(machine)
}

/// Fetch sensors with their MQTT topics. The query string is forwarded.
///
/// # Endpoint
///
/// `GET /api/sensors/mqtt-topics`
pub(crate) async fn mqtt_topics(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /api/sensors/mqtt-topics");

    let endpoint = data_collector(&state).await;
    let query: Vec<(String, String)> = params.into_iter().collect();
    let sensors = state
        .collector
        .get_json(
            &endpoint,
            "/api/sensors/mqtt-topics",
            &query,
            state.request_timeout(),
        )
        .await?;

    api_ok!(sensors)
}

/// Query parameters for sensor history.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    /// Window length in hours (default 24)
    pub hours: Option<String>,
}

fn requested_hours(raw: Option<&str>) -> u32 {
    raw.and_then(|hours| hours.trim().parse::<u32>().ok())
        .filter(|hours| *hours > 0)
        .unwrap_or(DEFAULT_HISTORY_HOURS)
}

/// Parse a history item timestamp: RFC 3339, zone-less ISO-8601 (taken as
/// UTC) or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Keep items whose timestamp lies in `[from, to]`, oldest first.
///
/// Items without a readable timestamp are dropped.
fn filter_history(history: Value, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Value> {
    let Value::Array(items) = history else {
        return Vec::new();
    };

    let mut stamped: Vec<(DateTime<Utc>, Value)> = items
        .into_iter()
        .filter_map(|item| {
            let timestamp = item.get("timestamp").and_then(parse_timestamp)?;
            (timestamp >= from && timestamp <= to).then_some((timestamp, item))
        })
        .collect();

    stamped.sort_by_key(|(timestamp, _)| *timestamp);
    stamped.into_iter().map(|(_, item)| item).collect()
}

/// Historical readings of a sensor, resolved by code.
///
/// The sensor id is looked up in the collector's sensor list, then its
/// history is fetched for the last `hours` hours. The result is filtered to
/// the window and sorted by timestamp.
///
/// # Endpoint
///
/// `GET /api/sensors/history/:sensor_code?hours=N`
///
/// # Errors
///
/// - `404` when the collector has no sensor with this code
pub(crate) async fn sensor_history(
    State(state): State<AppState>,
    Path(sensor_code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<SensorHistoryResponse>>, ApiError> {
    debug!("Request: GET /api/sensors/history/{}", sensor_code);

    let hours = requested_hours(query.hours.as_deref());
    let to = Utc::now();
    let from = to - chrono::Duration::hours(i64::from(hours));
    let to_param = to.format(COLLECTOR_TIME_FORMAT).to_string();
    let from_param = from.format(COLLECTOR_TIME_FORMAT).to_string();

    let endpoint = data_collector(&state).await;
    let sensors = state
        .collector
        .fetch_list(&endpoint, "/api/sensors/", state.request_timeout())
        .await?;

    let sensor = sensors
        .into_iter()
        .find(|sensor| sensor.str_field("code") == Some(sensor_code.as_str()))
        .ok_or_else(|| ScadaError::not_found("Sensor", sensor_code.as_str()))?;
    let sensor_id = sensor.id().cloned().unwrap_or(Value::Null);
    let id_key = value_key(&sensor_id)
        .ok_or_else(|| ScadaError::not_found("Sensor", sensor_code.as_str()))?;

    let path = format!("/api/sensors/{}/history", urlencoding::encode(&id_key));
    let params = [
        ("from".to_string(), from_param.clone()),
        ("to".to_string(), to_param.clone()),
    ];
    let history = state
        .collector
        .get_json(&endpoint, &path, &params, state.history_timeout())
        .await?;

    let history = filter_history(history, from, to);
    info!(
        "History for {}: requested {}h, got {} records after filtering",
        sensor_code,
        hours,
        history.len()
    );

    api_ok!(SensorHistoryResponse {
        sensor_name: sensor.get("name").cloned(),
        unit: sensor.get("unit").cloned(),
        sensor_code,
        sensor_id,
        requested_hours: hours,
        from: from_param,
        to: to_param,
        history,
    })
}

/// Collector health merged with local status.
///
/// Never fails: when the collector is unreachable the local status is
/// reported with `remote: false`.
///
/// # Endpoint
///
/// `GET /api/health`
pub(crate) async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    debug!("Request: GET /api/health");

    let endpoint = data_collector(&state).await;
    let result = state
        .collector
        .get_json(&endpoint, "/api/health", &[], state.probe_timeout())
        .await;

    let response = match result {
        Ok(Value::Object(mut details)) => {
            let status = match details.remove("status") {
                Some(Value::String(status)) => status,
                _ => "ok".to_string(),
            };
            for key in ["remote", "local", "error"] {
                details.remove(key);
            }
            HealthResponse {
                status,
                remote: true,
                local: true,
                error: None,
                details,
            }
        }
        Ok(_) => HealthResponse {
            status: "ok".to_string(),
            remote: true,
            local: true,
            error: None,
            details: Map::new(),
        },
        Err(ScadaError::Upstream { .. }) => HealthResponse {
            status: "error".to_string(),
            remote: false,
            local: true,
            error: None,
            details: Map::new(),
        },
        Err(e) => HealthResponse {
            status: "ok".to_string(),
            remote: false,
            local: true,
            error: Some(e.to_string()),
            details: Map::new(),
        },
    };

    api_ok!(response)
}

/// Collector version, or `local-only` when it cannot be reached.
///
/// # Endpoint
///
/// `GET /api/version`
pub(crate) async fn version(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<VersionResponse>>, ApiError> {
    debug!("Request: GET /api/version");

    let endpoint = data_collector(&state).await;
    let result = state
        .collector
        .get_json(&endpoint, "/api/version", &[], state.probe_timeout())
        .await;

    let (version, mut details) = match result {
        Ok(Value::Object(mut details)) => {
            let version = match details.remove("version") {
                Some(Value::String(version)) => version,
                Some(other) => other.to_string(),
                None => "unknown".to_string(),
            };
            (version, details)
        }
        Ok(_) => ("local-only".to_string(), Map::new()),
        Err(e) => {
            let mut details = Map::new();
            details.insert("error".to_string(), Value::String(e.to_string()));
            ("local-only".to_string(), details)
        }
    };
    details.remove("server");

    api_ok!(VersionResponse {
        version,
        server: env!("CARGO_PKG_VERSION").to_string(),
        details,
    })
}

async fn remote_count(
    state: &AppState,
    endpoint: &CollectorEndpoint,
    path: &str,
    timeout: Duration,
) -> usize {
    match state.collector.get_json(endpoint, path, &[], timeout).await {
        Ok(Value::Array(items)) => items.len(),
        Ok(_) => 0,
        Err(e) => {
            debug!("Could not count {}: {}", path, e);
            0
        }
    }
}

/// Database statistics from the collector plus local document statistics.
///
/// Tries `/api/db/stats/`, then `/api/stats/`, and merges
/// `/api/readings/stats/` into whichever answered.
///
/// # Endpoint
///
/// `GET /api/database/stats`
pub(crate) async fn database_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DatabaseStatsResponse>>, ApiError> {
    debug!("Request: GET /api/database/stats");

    let endpoint = state.config.collector().load().await.collector;
    let local = state.config.local_stats().await;

    if !endpoint.is_configured() || !endpoint.enabled {
        return api_ok!(DatabaseStatsResponse {
            connected: false,
            error: Some("Collector not configured or disabled".to_string()),
            database: None,
            inventory: None,
            local,
        });
    }

    let timeout = state.probe_timeout();
    let client = &state.collector;

    let mut database = None;
    for path in ["/api/db/stats/", "/api/stats/"] {
        match client.get_json(&endpoint, path, &[], timeout).await {
            Ok(stats) => {
                database = Some(stats);
                break;
            }
            Err(e) => debug!("No {} endpoint: {}", path, e),
        }
    }

    if let Ok(Value::Object(readings)) = client
        .get_json(&endpoint, "/api/readings/stats/", &[], timeout)
        .await
    {
        let mut merged = match database.take() {
            Some(Value::Object(stats)) => stats,
            _ => Map::new(),
        };
        merged.extend(readings);
        database = Some(Value::Object(merged));
    }

    let (machines, plcs, sensors) = tokio::join!(
        remote_count(&state, &endpoint, "/api/machines/", timeout),
        remote_count(&state, &endpoint, "/api/plcs/", timeout),
        remote_count(&state, &endpoint, "/api/sensors/", timeout),
    );

    api_ok!(DatabaseStatsResponse {
        connected: true,
        error: None,
        database: Some(database.unwrap_or_else(|| json!({"status": "unknown"}))),
        inventory: Some(InventoryCounts {
            machines,
            plcs,
            sensors,
        }),
        local,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_hours() {
        assert_eq!(requested_hours(None), 24);
        assert_eq!(requested_hours(Some("6")), 6);
        assert_eq!(requested_hours(Some("0")), 24);
        assert_eq!(requested_hours(Some("abc")), 24);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_timestamp(&json!("2024-05-01T10:00:00Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-05-01T10:00:00.000")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-05-01 10:00:00")), Some(expected));
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn test_filter_history_window_and_order() {
        let to = Utc::now();
        let from = to - chrono::Duration::hours(1);
        let at = |minutes: i64| {
            (to - chrono::Duration::minutes(minutes))
                .format(COLLECTOR_TIME_FORMAT)
                .to_string()
        };

        let history = json!([
            {"timestamp": at(10), "value": 3},
            {"timestamp": at(120), "value": 0},
            {"timestamp": at(50), "value": 1},
            {"timestamp": at(30), "value": 2},
            {"value": 9}
        ]);

        let values: Vec<Value> = filter_history(history, from, to)
            .into_iter()
            .map(|item| item["value"].clone())
            .collect();
        assert_eq!(values, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_filter_history_non_array() {
        let now = Utc::now();
        assert!(filter_history(json!({"detail": "x"}), now, now).is_empty());
    }
}
