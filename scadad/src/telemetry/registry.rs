//! Registry of machines and sensors seen on the MQTT bus
//!
//! Topics follow `machines/{machine}/{plc}/{sensor}`. Messages on other
//! topics are still forwarded to WebSocket clients but are not recorded.

use chrono::{DateTime, Utc};
use scada_core::api::{
    ConnectedMachine, ConnectedMachinesResponse, MachinesSummary, MqttCounters, SensorValue,
    SensorValuesResponse,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;

/// Segments of a telemetry topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TopicPath<'a> {
    pub machine: &'a str,
    pub plc: Option<&'a str>,
    pub sensor: Option<&'a str>,
}

/// Split a `machines/{machine}/{plc}/{sensor}` topic.
///
/// Needs at least three segments with `machines` first; the sensor segment
/// is optional and empty segments count as absent.
pub(crate) fn parse_topic(topic: &str) -> Option<TopicPath<'_>> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() < 3 || parts[0] != "machines" {
        return None;
    }

    let segment = |index: usize| parts.get(index).copied().filter(|s| !s.is_empty());

    Some(TopicPath {
        machine: parts[1],
        plc: segment(2),
        sensor: segment(3),
    })
}

/// Value fields extracted from a sensor payload.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Reading {
    pub value: Value,
    pub unit: String,
    pub display_value: Option<Value>,
    pub raw_value: Option<Value>,
}

/// Pull the reading out of a decoded payload.
///
/// Objects provide `value`, `val` or `v` (first non-null wins, else the whole
/// object); anything else is the value itself.
pub(crate) fn extract_reading(payload: &Value) -> Reading {
    let Value::Object(map) = payload else {
        return Reading {
            value: payload.clone(),
            unit: String::new(),
            display_value: None,
            raw_value: None,
        };
    };

    let value = ["value", "val", "v"]
        .iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
        .unwrap_or(payload)
        .clone();

    let unit = map
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Reading {
        value,
        unit,
        display_value: map.get("display_value").filter(|v| is_truthy(v)).cloned(),
        raw_value: map.get("raw_value").filter(|v| !v.is_null()).cloned(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Decode a raw MQTT payload: JSON when it parses, otherwise the text.
pub(crate) fn decode_payload(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
}

#[derive(Debug, Clone)]
struct MachineEntry {
    /// PLC code of the first message seen for the machine
    plc_code: Option<String>,
    sensors: BTreeSet<String>,
    last_seen: DateTime<Utc>,
    message_count: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    machines: HashMap<String, MachineEntry>,
    sensor_values: BTreeMap<String, SensorValue>,
    total_messages: u64,
}

/// Machine, sensor and message totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RegistryTotals {
    pub machines: usize,
    pub sensors: usize,
    pub total_messages: u64,
}

/// In-memory view of the telemetry stream
pub(crate) struct TelemetryRegistry {
    state: RwLock<RegistryState>,
    start_time: DateTime<Utc>,
    active_window: chrono::Duration,
}

impl TelemetryRegistry {
    /// Create an empty registry; machines seen within `active_window` count
    /// as active.
    pub fn new(active_window: Duration) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            start_time: Utc::now(),
            active_window: chrono::Duration::from_std(active_window)
                .unwrap_or_else(|_| chrono::Duration::seconds(30)),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Seconds since the registry was created.
    pub fn uptime_secs(&self) -> u64 {
        self.uptime_at(Utc::now())
    }

    fn uptime_at(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }

    /// Record a message. Returns the new total message count, or `None` when
    /// the topic is not a telemetry topic.
    pub async fn record(&self, topic: &str, payload: &Value) -> Option<u64> {
        self.record_at(topic, payload, Utc::now()).await
    }

    async fn record_at(&self, topic: &str, payload: &Value, now: DateTime<Utc>) -> Option<u64> {
        let path = parse_topic(topic)?;
        let mut state = self.state.write().await;

        let machine = state
            .machines
            .entry(path.machine.to_string())
            .or_insert_with(|| MachineEntry {
                plc_code: path.plc.map(str::to_string),
                sensors: BTreeSet::new(),
                last_seen: now,
                message_count: 0,
            });
        machine.last_seen = now;
        machine.message_count += 1;

        if let Some(sensor) = path.sensor {
            machine.sensors.insert(sensor.to_string());

            let reading = extract_reading(payload);
            state.sensor_values.insert(
                sensor.to_string(),
                SensorValue {
                    value: reading.value,
                    unit: reading.unit,
                    machine_code: path.machine.to_string(),
                    plc_code: path.plc.map(str::to_string),
                    timestamp: now.timestamp_millis(),
                    display_value: reading.display_value,
                    raw_value: reading.raw_value,
                    flash: false,
                },
            );
        }

        state.total_messages += 1;
        Some(state.total_messages)
    }

    pub async fn totals(&self) -> RegistryTotals {
        let state = self.state.read().await;
        RegistryTotals {
            machines: state.machines.len(),
            sensors: state.machines.values().map(|m| m.sensors.len()).sum(),
            total_messages: state.total_messages,
        }
    }

    /// Machines sorted by most recently seen.
    pub async fn machines(&self) -> Vec<ConnectedMachine> {
        self.machines_at(Utc::now()).await
    }

    async fn machines_at(&self, now: DateTime<Utc>) -> Vec<ConnectedMachine> {
        let state = self.state.read().await;
        let mut machines: Vec<ConnectedMachine> = state
            .machines
            .iter()
            .map(|(code, entry)| ConnectedMachine {
                code: code.clone(),
                plc_code: entry.plc_code.clone(),
                sensors: entry.sensors.iter().cloned().collect(),
                sensor_count: entry.sensors.len(),
                last_seen: entry.last_seen,
                message_count: entry.message_count,
                is_active: now - entry.last_seen < self.active_window,
            })
            .collect();

        machines.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.code.cmp(&b.code)));
        machines
    }

    /// Machines plus a summary, for `GET /api/machines/connected`.
    pub async fn connected_machines(&self) -> ConnectedMachinesResponse {
        let now = Utc::now();
        let machines = self.machines_at(now).await;
        let total_messages = self.state.read().await.total_messages;

        let summary = MachinesSummary {
            total_machines: machines.len(),
            active_machines: machines.iter().filter(|m| m.is_active).count(),
            total_sensors: machines.iter().map(|m| m.sensor_count).sum(),
            total_messages,
            uptime: self.uptime_at(now),
        };

        ConnectedMachinesResponse { machines, summary }
    }

    pub async fn counters(&self) -> MqttCounters {
        let totals = self.totals().await;
        MqttCounters {
            machine_count: totals.machines,
            sensor_count: totals.sensors,
            total_messages: totals.total_messages,
            start_time: self.start_time,
            uptime: self.uptime_secs(),
        }
    }

    /// Latest value of every sensor.
    pub async fn sensor_values(&self) -> SensorValuesResponse {
        let sensors = self.state.read().await.sensor_values.clone();
        SensorValuesResponse {
            count: sensors.len(),
            sensors,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> TelemetryRegistry {
        TelemetryRegistry::new(Duration::from_secs(30))
    }

    #[test]
    fn test_parse_topic() {
        assert_eq!(
            parse_topic("machines/PRESS-1/PLC-1/TEMP-1"),
            Some(TopicPath {
                machine: "PRESS-1",
                plc: Some("PLC-1"),
                sensor: Some("TEMP-1"),
            })
        );
        assert_eq!(
            parse_topic("machines/PRESS-1/PLC-1"),
            Some(TopicPath {
                machine: "PRESS-1",
                plc: Some("PLC-1"),
                sensor: None,
            })
        );
        assert_eq!(parse_topic("machines/PRESS-1/PLC-1/").unwrap().sensor, None);
        assert_eq!(parse_topic("machines/PRESS-1"), None);
        assert_eq!(parse_topic("plc/1/2/3"), None);
    }

    #[test]
    fn test_extract_reading_from_object() {
        let reading = extract_reading(&json!({
            "value": 21.5,
            "unit": "C",
            "display_value": "21.5 C",
            "raw_value": 215
        }));
        assert_eq!(reading.value, json!(21.5));
        assert_eq!(reading.unit, "C");
        assert_eq!(reading.display_value, Some(json!("21.5 C")));
        assert_eq!(reading.raw_value, Some(json!(215)));
    }

    #[test]
    fn test_extract_reading_fallbacks() {
        assert_eq!(extract_reading(&json!({"val": 3})).value, json!(3));
        assert_eq!(extract_reading(&json!({"value": null, "v": 4})).value, json!(4));
        assert_eq!(extract_reading(&json!({"value": 0})).value, json!(0));

        let whole = json!({"temp": 5});
        assert_eq!(extract_reading(&whole).value, whole);

        let scalar = extract_reading(&json!(12));
        assert_eq!(scalar.value, json!(12));
        assert_eq!(scalar.unit, "");
        assert!(scalar.display_value.is_none());
    }

    #[test]
    fn test_extract_reading_ignores_falsy_display_value() {
        let reading = extract_reading(&json!({"value": 1, "display_value": ""}));
        assert!(reading.display_value.is_none());
        let reading = extract_reading(&json!({"value": 1, "raw_value": 0}));
        assert_eq!(reading.raw_value, Some(json!(0)));
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload(br#"{"value": 1}"#), json!({"value": 1}));
        assert_eq!(decode_payload(b"42"), json!(42));
        assert_eq!(decode_payload(b"ON"), json!("ON"));
    }

    #[tokio::test]
    async fn test_record_tracks_machines_and_sensors() {
        let registry = registry();

        assert_eq!(
            registry
                .record("machines/M1/PLC-A/T1", &json!({"value": 1, "unit": "C"}))
                .await,
            Some(1)
        );
        registry.record("machines/M1/PLC-B/T2", &json!(2)).await;
        registry.record("machines/M2/PLC-C", &json!(3)).await;

        let totals = registry.totals().await;
        assert_eq!(totals.machines, 2);
        assert_eq!(totals.sensors, 2);
        assert_eq!(totals.total_messages, 3);

        let machines = registry.machines().await;
        let m1 = machines.iter().find(|m| m.code == "M1").unwrap();
        assert_eq!(m1.plc_code.as_deref(), Some("PLC-A"));
        assert_eq!(m1.sensors, vec!["T1", "T2"]);
        assert_eq!(m1.message_count, 2);
        assert!(m1.is_active);

        let values = registry.sensor_values().await;
        assert_eq!(values.count, 2);
        assert_eq!(values.sensors["T1"].unit, "C");
        assert_eq!(values.sensors["T2"].plc_code.as_deref(), Some("PLC-B"));
        assert!(!values.sensors["T1"].flash);
    }

    #[tokio::test]
    async fn test_record_ignores_foreign_topics() {
        let registry = registry();
        assert_eq!(registry.record("plc/1/temp", &json!(1)).await, None);
        assert_eq!(registry.totals().await.total_messages, 0);
    }

    #[tokio::test]
    async fn test_machines_sorted_and_activity_window() {
        let registry = registry();
        let now = Utc::now();
        let old = now - chrono::Duration::seconds(120);

        registry.record_at("machines/OLD/P/S", &json!(1), old).await;
        registry.record_at("machines/NEW/P/S2", &json!(1), now).await;

        let machines = registry.machines_at(now).await;
        assert_eq!(machines[0].code, "NEW");
        assert!(machines[0].is_active);
        assert_eq!(machines[1].code, "OLD");
        assert!(!machines[1].is_active);
    }

    #[tokio::test]
    async fn test_connected_machines_summary() {
        let registry = registry();
        registry.record("machines/M1/P/S1", &json!(1)).await;
        registry.record("machines/M1/P/S2", &json!(1)).await;

        let response = registry.connected_machines().await;
        assert_eq!(response.summary.total_machines, 1);
        assert_eq!(response.summary.active_machines, 1);
        assert_eq!(response.summary.total_sensors, 2);
        assert_eq!(response.summary.total_messages, 2);
    }
}
