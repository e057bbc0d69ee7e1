//! MQTT listener supervision
//!
//! A single background task owns the rumqttc client. Restarting aborts the
//! running task, waits for it to finish, then spawns a new one with the
//! current settings. Only one listener ever writes the shared status.

use crate::config::RuntimeConfig;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use scada_core::api::{MqttSummary, ProbeStatus};
use scada_core::{CollectorConfig, DataConfig, MqttSettings};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{TelemetryBroadcaster, TelemetryMessage, TelemetryRegistry};

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Topic subscribed to when the settings leave it blank.
const DEFAULT_TOPIC: &str = "plc/#";

/// Connection state of the listener
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ListenerStatus {
    pub connected: bool,
    /// `mqtt://host:port`, empty when no listener is configured
    pub broker: String,
    pub topic: String,
}

/// Pick the settings the listener should use.
///
/// The mqtt section of collector.yaml wins when it is enabled and names a
/// broker; otherwise the data-source mqtt section is used if enabled.
pub(crate) fn listener_settings(
    collector: &CollectorConfig,
    data: &DataConfig,
) -> Option<MqttSettings> {
    [&collector.mqtt, &data.mqtt]
        .into_iter()
        .find(|mqtt| mqtt.enabled && mqtt.broker_address().is_some())
        .cloned()
}

/// Owns the MQTT listener task
pub(crate) struct MqttSupervisor {
    registry: Arc<TelemetryRegistry>,
    broadcaster: TelemetryBroadcaster,
    status: Arc<RwLock<ListenerStatus>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttSupervisor {
    pub fn new(registry: Arc<TelemetryRegistry>, broadcaster: TelemetryBroadcaster) -> Self {
        Self {
            registry,
            broadcaster,
            status: Arc::new(RwLock::new(ListenerStatus::default())),
            task: Mutex::new(None),
        }
    }

    /// Re-read the documents and restart the listener with whatever settings
    /// apply now. Stops the listener when none do.
    pub async fn reload(&self, config: &RuntimeConfig) -> bool {
        let collector = config.collector().load().await;
        let data = config.data_config().load().await;

        match listener_settings(&collector, &data) {
            Some(settings) => self.restart(&settings).await,
            None => {
                info!("MQTT listener disabled: no enabled broker configured");
                self.stop().await;
                false
            }
        }
    }

    /// Abort the running listener, if any, and start a new one.
    ///
    /// Returns `false` when the settings do not name a broker.
    pub async fn restart(&self, settings: &MqttSettings) -> bool {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            info!("Disconnecting previous MQTT client...");
            shut_down(handle).await;
        }

        let Some((host, port)) = settings.broker_address() else {
            warn!("MQTT settings have no broker address; listener not started");
            *self.status.write().await = ListenerStatus::default();
            return false;
        };

        let topic = match settings.topic.trim() {
            "" => DEFAULT_TOPIC.to_string(),
            topic => topic.to_string(),
        };

        *self.status.write().await = ListenerStatus {
            connected: false,
            broker: format!("mqtt://{}:{}", host, port),
            topic: topic.clone(),
        };

        let listener = Listener {
            host,
            port,
            topic,
            registry: self.registry.clone(),
            broadcaster: self.broadcaster.clone(),
            status: self.status.clone(),
        };
        *task = Some(tokio::spawn(listener.run()));
        true
    }

    /// Stop the listener.
    pub async fn stop(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            shut_down(handle).await;
            info!("MQTT listener stopped");
        }
        self.status.write().await.connected = false;
    }

    pub async fn status(&self) -> ListenerStatus {
        self.status.read().await.clone()
    }

    /// Listener state combined with registry totals.
    pub async fn summary(&self) -> MqttSummary {
        let status = self.status().await;
        let totals = self.registry.totals().await;

        MqttSummary {
            status: if status.connected {
                ProbeStatus::Online
            } else {
                ProbeStatus::Offline
            },
            connected: status.connected,
            broker: status.broker,
            topic: status.topic,
            machines: totals.machines,
            sensors: totals.sensors,
            total_messages: totals.total_messages,
            uptime: self.registry.uptime_secs(),
        }
    }
}

/// Abort a listener task and wait until it has been dropped.
async fn shut_down(handle: JoinHandle<()>) {
    handle.abort();
    if let Err(e) = handle.await {
        if e.is_panic() {
            error!("MQTT listener panicked: {}", e);
        }
    }
}

impl Drop for MqttSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

struct Listener {
    host: String,
    port: u16,
    topic: String,
    registry: Arc<TelemetryRegistry>,
    broadcaster: TelemetryBroadcaster,
    status: Arc<RwLock<ListenerStatus>>,
}

impl Listener {
    async fn run(self) {
        let client_id = format!("scadad-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        info!(
            "Connecting to MQTT broker at mqtt://{}:{}...",
            self.host, self.port
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("Connected to MQTT broker");
                    self.set_connected(true).await;

                    match client.subscribe(self.topic.clone(), QoS::AtMostOnce).await {
                        Ok(()) => info!("Subscribed to MQTT topic: {}", self.topic),
                        Err(e) => error!("Failed to subscribe to {}: {}", self.topic, e),
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    self.handle_publish(publish.topic, &publish.payload).await;
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    warn!("MQTT broker closed the connection");
                    self.set_connected(false).await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("MQTT connection error: {}", e);
                    self.set_connected(false).await;
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    debug!("Reconnecting to MQTT broker...");
                }
            }
        }
    }

    async fn handle_publish(&self, topic: String, raw: &[u8]) {
        let payload = super::decode_payload(raw);

        if let Some(total) = self.registry.record(&topic, &payload).await {
            if total % 100 == 0 {
                let machines = self.registry.totals().await.machines;
                info!("MQTT: {} messages, {} machines active", total, machines);
            }
        }

        self.broadcaster.broadcast(TelemetryMessage { topic, payload });
    }

    async fn set_connected(&self, connected: bool) {
        self.status.write().await.connected = connected;
    }
}
