//! Live telemetry from the MQTT bus
//!
//! - [`TelemetryRegistry`] - machines, sensors and latest values
//! - [`TelemetryBroadcaster`] - fan-out to WebSocket clients
//! - [`MqttSupervisor`] - owns the MQTT listener task

mod broadcaster;
mod mqtt;
mod registry;

pub(crate) use broadcaster::{TelemetryBroadcaster, TelemetryMessage};
pub(crate) use mqtt::MqttSupervisor;
pub(crate) use registry::{decode_payload, TelemetryRegistry};
