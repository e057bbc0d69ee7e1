//! Connection probes and host metrics
//!
//! Probes never fail: every outcome, including timeouts, is reported as a
//! [`ProbeResult`].

use chrono::Utc;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, Incoming, MqttOptions};
use scada_core::api::{ProbeResult, ProbeStatus, ProcessMetrics, SystemMetrics};
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Check that `host:port` accepts TCP connections.
pub(crate) async fn probe_tcp(host: &str, port: u16, timeout: Duration) -> ProbeResult {
    debug!("Testing TCP reachability of {}:{}...", host, port);
    let started = Instant::now();

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => ProbeResult::ok(ProbeStatus::Reachable)
            .with_latency(started.elapsed().as_millis() as u64)
            .with_message(format!(
                "Port {} reachable on {}. A real connection needs valid credentials.",
                port, host
            )),
        Ok(Err(e)) => ProbeResult::failed(ProbeStatus::Error, e.to_string()),
        Err(_) => ProbeResult::failed(ProbeStatus::Timeout, "Connection timeout"),
    }
}

/// Complete an MQTT handshake with the broker, then drop the connection.
pub(crate) async fn probe_mqtt(host: &str, port: u16, timeout: Duration) -> ProbeResult {
    debug!("Testing MQTT connection to mqtt://{}:{}...", host, port);

    let client_id = format!(
        "scadad-probe-{}-{}",
        std::process::id(),
        Utc::now().timestamp_millis()
    );
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(5));

    // The client must outlive the handshake or the event loop shuts down.
    let (_client, mut eventloop) = AsyncClient::new(options, 10);
    let started = Instant::now();

    let handshake = async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(ack))) => return Ok(ack.code),
                Ok(_) => continue,
                Err(e) => return Err(e),
            }
        }
    };

    match tokio::time::timeout(timeout, handshake).await {
        Ok(Ok(ConnectReturnCode::Success)) => {
            let latency = started.elapsed().as_millis() as u64;
            ProbeResult::ok(ProbeStatus::Online).with_latency(latency)
        }
        Ok(Ok(code)) => ProbeResult::failed(
            ProbeStatus::Error,
            format!("Broker refused connection: {:?}", code),
        ),
        Ok(Err(e)) => ProbeResult::failed(ProbeStatus::Error, e.to_string()),
        Err(_) => ProbeResult::failed(ProbeStatus::Timeout, "Connection timeout"),
    }
}

/// Host and process metrics.
pub(crate) struct HostMetrics {
    pub hostname: String,
    pub system: SystemMetrics,
    pub process: ProcessMetrics,
}

/// Sample host CPU, memory and process usage.
///
/// CPU usage needs two samples, so this blocks for
/// [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] on a blocking thread.
pub(crate) async fn collect_host_metrics() -> HostMetrics {
    match tokio::task::spawn_blocking(sample_host).await {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!("Host metrics task failed: {}", e);
            HostMetrics {
                hostname: String::new(),
                system: empty_system_metrics(),
                process: ProcessMetrics {
                    pid: std::process::id(),
                    rss: 0,
                    virtual_memory: 0,
                },
            }
        }
    }
}

fn sample_host() -> HostMetrics {
    let mut sys = System::new_all();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu();

    let total_memory = sys.total_memory();
    let free_memory = sys.available_memory();
    let used_memory = total_memory.saturating_sub(free_memory);
    let load = System::load_average();

    let system = SystemMetrics {
        cpu_count: sys.cpus().len(),
        cpu_usage: round1(sys.global_cpu_info().cpu_usage()),
        cpu_model: sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        total_memory,
        free_memory,
        used_memory,
        memory_usage: percent(used_memory, total_memory),
        system_uptime: System::uptime(),
        load_average: [load.one, load.five, load.fifteen],
    };

    let pid = std::process::id();
    let (rss, virtual_memory) = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|process| (process.memory(), process.virtual_memory()))
        .unwrap_or_default();

    HostMetrics {
        hostname: System::host_name().unwrap_or_default(),
        system,
        process: ProcessMetrics {
            pid,
            rss,
            virtual_memory,
        },
    }
}

fn empty_system_metrics() -> SystemMetrics {
    SystemMetrics {
        cpu_count: 0,
        cpu_usage: 0.0,
        cpu_model: "Unknown".to_string(),
        total_memory: 0,
        free_memory: 0,
        used_memory: 0,
        memory_usage: 0.0,
        system_uptime: 0,
        load_average: [0.0; 3],
    }
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    round1(part as f32 / total as f32 * 100.0)
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
