//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use scada_core::api::{
    ConnectedMachinesResponse, ConnectionStatus, HealthResponse, InfoResponse, InventoryStats,
    ProbeResult, ProbeStatus, SensorHistoryResponse, SensorValuesResponse, ServerStatus,
};
use scada_core::{AuthUser, Record};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

fn json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render a JSON value for a table cell.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn colored_status(status: ProbeStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        ProbeStatus::Online => text.green(),
        ProbeStatus::Reachable => text.cyan(),
        ProbeStatus::AuthError | ProbeStatus::Timeout => text.yellow(),
        ProbeStatus::Error | ProbeStatus::Offline => text.red(),
        ProbeStatus::Unknown => text.dimmed(),
    }
}

fn yes_no(value: bool) -> ColoredString {
    if value {
        "Yes".green()
    } else {
        "No".red()
    }
}

/// Format free-form records as a table.
///
/// Columns are the union of keys, with `id` first when present.
pub fn format_records(title: &str, records: &[Record], format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(&records),
        OutputFormat::Table => {
            if records.is_empty() {
                return Ok(format!("{}\n{}", title.bold(), "(none)".dimmed()));
            }

            let keys: BTreeSet<&str> = records
                .iter()
                .flat_map(|r| r.as_map().keys().map(String::as_str))
                .collect();
            let mut columns: Vec<&str> = Vec::with_capacity(keys.len());
            if keys.contains("id") {
                columns.push("id");
            }
            columns.extend(keys.into_iter().filter(|k| *k != "id"));

            let mut builder = Builder::default();
            builder.push_record(columns.iter().copied());
            for record in records {
                builder.push_record(columns.iter().map(|c| cell(record.get(c))));
            }

            let table = builder.build().with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", title.bold(), table))
        }
    }
}

/// Format a single record as key/value lines.
pub fn format_record(title: &str, record: &Record, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(record),
        OutputFormat::Table => {
            let mut output = title.bold().to_string();
            for (key, value) in record.as_map() {
                output.push('\n');
                output.push_str(&format!("{}: {}", key, cell(Some(value)).cyan()));
            }
            Ok(output)
        }
    }
}

/// Format info response
pub fn format_info(info: &InfoResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(info),
        OutputFormat::Table => Ok(format!(
            "{}\nVersion: {}\nUptime: {} seconds\nWebSocket: {}",
            info.name.bold(),
            info.version.cyan(),
            info.uptime.to_string().yellow(),
            info.websocket.cyan()
        )),
    }
}

/// Format health response
pub fn format_health(health: &HealthResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(health),
        OutputFormat::Table => {
            let status = if health.status == "ok" {
                health.status.green()
            } else {
                health.status.red()
            };
            let mut output = format!(
                "{}\nStatus: {}\nCollector reachable: {}\nLocal: {}",
                "Server Health:".bold(),
                status,
                yes_no(health.remote),
                yes_no(health.local)
            );
            if let Some(error) = &health.error {
                output.push_str(&format!("\nError: {}", error.red()));
            }
            Ok(output)
        }
    }
}

/// Format a connection test result
pub fn format_probe(name: &str, probe: &ProbeResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(probe),
        OutputFormat::Table => {
            let mark = if probe.success {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            };
            let mut output = format!("{} {}: {}", mark, name, colored_status(probe.status));
            if let Some(latency) = probe.latency_ms {
                output.push_str(&format!(" ({} ms)", latency));
            }
            if let Some(message) = &probe.message {
                output.push_str(&format!("\n  {}", message));
            }
            if let Some(error) = &probe.error {
                output.push_str(&format!("\n  {}", error.red()));
            }
            Ok(output)
        }
    }
}

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Details")]
    details: String,
}

fn probe_details(probe: &ProbeResult) -> String {
    match (&probe.error, probe.latency_ms) {
        (Some(error), _) => error.clone(),
        (None, Some(latency)) => format!("{} ms", latency),
        (None, None) => probe.message.clone().unwrap_or_default(),
    }
}

/// Format connection status
pub fn format_connection_status(status: &ConnectionStatus, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(status),
        OutputFormat::Table => {
            let rows = vec![
                ConnectionRow {
                    service: "Collector".to_string(),
                    status: colored_status(status.collector.status).to_string(),
                    details: probe_details(&status.collector),
                },
                ConnectionRow {
                    service: "MQTT".to_string(),
                    status: colored_status(status.mqtt.status).to_string(),
                    details: format!("{} ({})", status.mqtt.broker, status.mqtt.topic),
                },
                ConnectionRow {
                    service: "Database".to_string(),
                    status: colored_status(status.database.status).to_string(),
                    details: probe_details(&status.database),
                },
            ];

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Connections:".bold(), table))
        }
    }
}

/// Format the full server status report
pub fn format_server_status(status: &ServerStatus, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(status),
        OutputFormat::Table => {
            let server = &status.server;
            let system = &status.system;
            let mut output = format!(
                "{} {}\nHost: {} ({} {})\nUptime: {} seconds",
                server.name.bold(),
                server.version.cyan(),
                server.hostname,
                server.platform,
                server.arch,
                server.uptime.to_string().yellow()
            );
            output.push_str(&format!(
                "\nCPU: {} x {} ({:.1}%)\nMemory: {:.1}% of {} MiB\nProcess RSS: {} MiB",
                system.cpu_count,
                system.cpu_model,
                system.cpu_usage,
                system.memory_usage,
                system.total_memory / (1024 * 1024),
                status.process.rss / (1024 * 1024)
            ));

            let rows = vec![
                ConnectionRow {
                    service: "Collector".to_string(),
                    status: colored_status(status.collector.probe.status).to_string(),
                    details: format!("{}:{}", status.collector.host, status.collector.port),
                },
                ConnectionRow {
                    service: "MQTT".to_string(),
                    status: colored_status(status.mqtt.summary.status).to_string(),
                    details: format!(
                        "{} ({:.1} msg/s)",
                        status.mqtt.summary.broker, status.mqtt.messages_per_second
                    ),
                },
                ConnectionRow {
                    service: "Database".to_string(),
                    status: colored_status(status.database.probe.status).to_string(),
                    details: format!("{}:{}", status.database.host, status.database.port),
                },
            ];
            output.push('\n');
            output.push_str(&Table::new(rows).with(Style::rounded()).to_string());
            output.push_str(&format!(
                "\nWebSocket clients: {}",
                status.connections.websocket_clients
            ));
            Ok(output)
        }
    }
}

/// Format inventory statistics
pub fn format_inventory_stats(stats: &InventoryStats, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(stats),
        OutputFormat::Table => {
            let modified = stats
                .last_modified
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            Ok(format!(
                "{}\nMachines: {}\nPLCs: {}\nSensors: {}\nLast modified: {}",
                "Inventory:".bold(),
                stats.counts.machines.to_string().cyan(),
                stats.counts.plcs.to_string().cyan(),
                stats.counts.sensors.to_string().cyan(),
                modified
            ))
        }
    }
}

/// Format machines seen on the telemetry feed
pub fn format_machines(response: &ConnectedMachinesResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(response),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct MachineRow {
                #[tabled(rename = "Machine")]
                code: String,
                #[tabled(rename = "PLC")]
                plc: String,
                #[tabled(rename = "Sensors")]
                sensors: usize,
                #[tabled(rename = "Messages")]
                messages: u64,
                #[tabled(rename = "Last Seen")]
                last_seen: String,
            }

            let rows: Vec<MachineRow> = response
                .machines
                .iter()
                .map(|m| MachineRow {
                    code: if m.is_active {
                        m.code.green().to_string()
                    } else {
                        m.code.dimmed().to_string()
                    },
                    plc: m.plc_code.clone().unwrap_or_else(|| "-".to_string()),
                    sensors: m.sensor_count,
                    messages: m.message_count,
                    last_seen: m.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
                })
                .collect();

            let summary = &response.summary;
            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!(
                "{}\n{}\n{} of {} active, {} sensors, {} messages",
                "Connected Machines:".bold(),
                table,
                summary.active_machines,
                summary.total_machines,
                summary.total_sensors,
                summary.total_messages
            ))
        }
    }
}

/// Format latest sensor values
pub fn format_sensor_values(response: &SensorValuesResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(response),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct ValueRow {
                #[tabled(rename = "Sensor")]
                sensor: String,
                #[tabled(rename = "Value")]
                value: String,
                #[tabled(rename = "Unit")]
                unit: String,
                #[tabled(rename = "Machine")]
                machine: String,
            }

            let rows: Vec<ValueRow> = response
                .sensors
                .iter()
                .map(|(code, v)| ValueRow {
                    sensor: code.cyan().to_string(),
                    value: cell(v.display_value.as_ref().or(Some(&v.value))),
                    unit: v.unit.clone(),
                    machine: v.machine_code.clone(),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Sensor Values:".bold(), table))
        }
    }
}

/// Format a sensor's reading history
pub fn format_history(response: &SensorHistoryResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(response),
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["Timestamp", "Value"]);
            for reading in &response.history {
                builder.push_record([
                    cell(reading.get("timestamp")),
                    cell(reading.get("value")),
                ]);
            }

            let table = builder.build().with(Style::rounded()).to_string();
            Ok(format!(
                "{} {} (last {} h, {} readings)\n{}",
                "History for".bold(),
                response.sensor_code.cyan(),
                response.requested_hours,
                response.history.len(),
                table
            ))
        }
    }
}

/// Format the logged-in user
pub fn format_user(user: &AuthUser, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(user),
        OutputFormat::Table => {
            let expires = user
                .expires_at_utc()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            Ok(format!(
                "User: {}\nRole: {}\nPermissions: {}\nExpires: {}",
                user.username.cyan(),
                user.role.to_string().yellow(),
                user.permissions.join(", "),
                expires
            ))
        }
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
