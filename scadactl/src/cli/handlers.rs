//! Command execution handlers

use anyhow::Result;
use scada_core::config::{CollectorUpdate, DatabaseUpdate, MqttUpdate};
use scada_core::auth::PERMISSION_EDIT_CONFIG;
use scada_core::{
    AuthService, Credentials, DataConfigUpdate, InventoryUpdate, Record, SessionStorage,
};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::client::ScadaClient;
use crate::config::{set_config_value, CliConfig};
use crate::format::{self, format_success};

use super::commands::*;

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse `key=value` arguments into a record.
///
/// Values that parse as JSON keep their type; anything else is a string.
pub fn parse_fields(fields: &[String]) -> Result<Record> {
    let mut record = Record::new();
    for field in fields {
        let (key, raw) = field
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid field '{}': expected key=value", field))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("Invalid field '{}': empty key", field));
        }
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        record.insert(key, value);
    }
    Ok(record)
}

/// Fail unless the session grants configuration edits.
pub fn require_edit<S: SessionStorage>(auth: &mut AuthService<S>) -> Result<()> {
    if !auth.is_authenticated() {
        return Err(anyhow::anyhow!("Not logged in. Run 'scadactl login' first"));
    }
    if !auth.has_permission(PERMISSION_EDIT_CONFIG) {
        return Err(anyhow::anyhow!(
            "Permission denied: '{}' is required",
            PERMISSION_EDIT_CONFIG
        ));
    }
    Ok(())
}

/// Handle login, logout and whoami
pub fn handle_session<S: SessionStorage>(
    auth: &mut AuthService<S>,
    command: &Commands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            let user = auth.login(&Credentials::new(username.as_str(), password.as_str()))?;
            match format {
                OutputFormat::Json => print_json(&user)?,
                OutputFormat::Table => println!(
                    "{}",
                    format_success(&format!("Logged in as {} ({})", user.username, user.role))
                ),
            }
        }
        Commands::Logout => {
            auth.logout();
            println!("{}", format_success("Logged out"));
        }
        Commands::Whoami => match auth.current_user() {
            Some(user) => println!("{}", format::format_user(&user, &format.into())?),
            None => return Err(anyhow::anyhow!("Not logged in")),
        },
        _ => return Err(anyhow::anyhow!("Not a session command")),
    }

    Ok(())
}

/// Handle info command
pub async fn handle_info(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let info = client.get_info().await?;
    println!("{}", format::format_info(&info, &format.into())?);
    Ok(())
}

/// Handle health command
pub async fn handle_health(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let health = client.health().await?;
    println!("{}", format::format_health(&health, &format.into())?);
    Ok(())
}

/// Handle version command
pub async fn handle_version(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let version = client.version().await?;

    match format {
        OutputFormat::Json => print_json(&version)?,
        OutputFormat::Table => {
            println!("Collector version: {}", version.version);
            println!("Server version: {}", version.server);
        }
    }

    Ok(())
}

/// Handle status command
pub async fn handle_status(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let status = client.server_status().await?;
    println!("{}", format::format_server_status(&status, &format.into())?);
    Ok(())
}

/// Handle connections command
pub async fn handle_connections(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let status = client.connection_status().await?;
    println!("{}", format::format_connection_status(&status, &format.into())?);
    Ok(())
}

/// Handle db-stats command
pub async fn handle_db_stats(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let stats = client.database_stats().await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!(
                "Collector connected: {}",
                if stats.connected { "yes" } else { "no" }
            );
            if let Some(error) = &stats.error {
                println!("Error: {}", error);
            }
            if let Some(counts) = &stats.inventory {
                println!(
                    "Remote inventory: {} machines, {} PLCs, {} sensors",
                    counts.machines, counts.plcs, counts.sensors
                );
            }
            let local = &stats.local.counts;
            println!(
                "Local inventory: {} machines, {} PLCs, {} sensors",
                local.machines, local.plcs, local.sensors
            );
            for (name, file) in &stats.local.files {
                println!("{:<20} {} bytes", name, file.size);
            }
        }
    }

    Ok(())
}

/// Handle system command
pub async fn handle_system(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let config = client.get_config().await?;

    match format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Table => {
            let format: format::OutputFormat = format.into();
            println!(
                "{}",
                format::format_records("Backends:", &config.backends, &format)?
            );
            println!(
                "{}",
                format::format_records("Metrics:", &config.dashboards.metrics, &format)?
            );
            let layouts: Vec<&str> = config.layouts.keys().map(String::as_str).collect();
            println!("Layouts: {}", layouts.join(", "));
        }
    }

    Ok(())
}

/// Handle backend commands
pub async fn handle_backend<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: BackendCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        BackendCommands::List => {
            let backends = client.list_backends().await?;
            println!(
                "{}",
                format::format_records("Backends:", &backends, &format.into())?
            );
        }
        BackendCommands::Set { id, fields } => {
            require_edit(auth)?;
            let mut backend = parse_fields(&fields)?;
            backend.insert("id", Value::String(id.clone()));
            client.upsert_backend(&backend).await?;
            println!("{}", format_success(&format!("Saved backend '{}'", id)));
        }
        BackendCommands::Remove { id } => {
            require_edit(auth)?;
            client.delete_backend(&id).await?;
            println!("{}", format_success(&format!("Removed backend '{}'", id)));
        }
    }

    Ok(())
}

/// Handle metric commands
pub async fn handle_metric<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: MetricCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        MetricCommands::List => {
            let metrics = client.list_metrics().await?;
            println!(
                "{}",
                format::format_records("Metrics:", &metrics, &format.into())?
            );
        }
        MetricCommands::Add { fields } => {
            require_edit(auth)?;
            let metric = client.add_metric(&parse_fields(&fields)?).await?;
            let id = metric.id_string().unwrap_or_else(|| "-".to_string());
            println!("{}", format_success(&format!("Added metric '{}'", id)));
        }
        MetricCommands::Update { id, fields } => {
            require_edit(auth)?;
            client.update_metric(&id, &parse_fields(&fields)?).await?;
            println!("{}", format_success(&format!("Updated metric '{}'", id)));
        }
        MetricCommands::Remove { id } => {
            require_edit(auth)?;
            client.delete_metric(&id).await?;
            println!("{}", format_success(&format!("Removed metric '{}'", id)));
        }
    }

    Ok(())
}

/// Handle layout command
pub async fn handle_layout(
    client: &ScadaClient,
    machine_id: &str,
    format: &OutputFormat,
) -> Result<()> {
    let layout = client.get_layout(machine_id).await?;

    match format {
        OutputFormat::Json => print_json(&layout)?,
        OutputFormat::Table => println!(
            "{}",
            format::format_records(
                &format!("Layout for {}:", layout.machine_id),
                &layout.widgets,
                &format.into()
            )?
        ),
    }

    Ok(())
}

/// Handle inventory commands
pub async fn handle_inventory<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: InventoryCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        InventoryCommands::Stats => {
            let stats = client.inventory_stats().await?;
            println!("{}", format::format_inventory_stats(&stats, &format.into())?);
        }
        InventoryCommands::Plcs => {
            let plcs = client.list_plcs().await?;
            println!("{}", format::format_records("PLCs:", &plcs, &format.into())?);
        }
        InventoryCommands::Sensors => {
            let sensors = client.list_sensors().await?;
            println!(
                "{}",
                format::format_records("Sensors:", &sensors, &format.into())?
            );
        }
        InventoryCommands::Import { file } => {
            require_edit(auth)?;
            let update = read_inventory_file(&file)?;
            let result = client.save_inventory(&update).await?;
            println!("{}", format_success(&result.message));
        }
        InventoryCommands::Sync => {
            require_edit(auth)?;
            let result = client.sync_inventory().await?;
            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Table => println!("{}", format_success(&result.message)),
            }
        }
    }

    Ok(())
}

/// Read an inventory update from a YAML or JSON file.
///
/// JSON is a subset of YAML, so one parser covers both.
pub fn read_inventory_file(path: &Path) -> Result<InventoryUpdate> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let update: InventoryUpdate = serde_yaml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid inventory file {}: {}", path.display(), e))?;

    if update.machines.is_none() && update.plcs.is_none() && update.sensors.is_none() {
        return Err(anyhow::anyhow!(
            "{} has none of 'machines', 'plcs' or 'sensors'",
            path.display()
        ));
    }
    Ok(update)
}

/// Handle PLC commands
pub async fn handle_plc<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: PlcCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        PlcCommands::Update { id, fields } => {
            require_edit(auth)?;
            let plc = client.update_plc(&id, &parse_fields(&fields)?).await?;
            println!(
                "{}",
                format::format_record(&format!("PLC {}:", id), &plc, &format.into())?
            );
        }
    }

    Ok(())
}

/// Handle sensor commands
pub async fn handle_sensor<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: SensorCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        SensorCommands::Update { id, fields } => {
            require_edit(auth)?;
            let sensor = client.update_sensor(&id, &parse_fields(&fields)?).await?;
            println!(
                "{}",
                format::format_record(&format!("Sensor {}:", id), &sensor, &format.into())?
            );
        }
        SensorCommands::History { code, hours } => {
            let history = client.sensor_history(&code, hours).await?;
            println!("{}", format::format_history(&history, &format.into())?);
        }
    }

    Ok(())
}

/// Handle collector command
pub async fn handle_collector(client: &ScadaClient, format: &OutputFormat) -> Result<()> {
    let collector = client.get_collector().await?;

    match format {
        OutputFormat::Json => print_json(&collector)?,
        OutputFormat::Table => {
            let endpoint = &collector.collector;
            println!("Collector: {}", endpoint.base_url());
            println!("Enabled: {}", endpoint.enabled);
            println!(
                "Token: {}",
                if endpoint.token.is_empty() { "not set" } else { "set" }
            );
            println!(
                "MQTT: {} ({}) enabled={}",
                collector.mqtt.broker_display(),
                collector.mqtt.topic,
                collector.mqtt.enabled
            );
        }
    }

    Ok(())
}

/// Handle machine commands
pub async fn handle_machine(
    client: &ScadaClient,
    command: MachineCommands,
    format: &OutputFormat,
) -> Result<()> {
    let (title, value) = match command {
        MachineCommands::List => ("Machines:".to_string(), client.list_machines().await?),
        MachineCommands::Show { id } => (format!("Machine {}:", id), client.get_machine(&id).await?),
        MachineCommands::Topics { machine } => {
            let query: Vec<(&str, &str)> = machine
                .as_deref()
                .map(|m| vec![("machine", m)])
                .unwrap_or_default();
            ("MQTT Topics:".to_string(), client.mqtt_topics(&query).await?)
        }
    };

    print_value(&title, value, format)
}

/// Print collector data: arrays of objects as a table, anything else as JSON.
fn print_value(title: &str, value: Value, format: &OutputFormat) -> Result<()> {
    if let OutputFormat::Table = format {
        match value {
            Value::Array(items) => {
                let records: Option<Vec<Record>> =
                    items.iter().cloned().map(|v| Record::try_from(v).ok()).collect();
                if let Some(records) = records {
                    println!("{}", format::format_records(title, &records, &format.into())?);
                    return Ok(());
                }
                return print_json(&Value::Array(items));
            }
            Value::Object(map) => {
                println!("{}", format::format_record(title, &Record::from(map), &format.into())?);
                return Ok(());
            }
            other => return print_json(&other),
        }
    }
    print_json(&value)
}

/// Handle mqtt commands
pub async fn handle_mqtt<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: MqttCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        MqttCommands::Show => {
            let mqtt = client.get_mqtt_config().await?;
            match format {
                OutputFormat::Json => print_json(&mqtt)?,
                OutputFormat::Table => {
                    println!("Broker: {}", mqtt.broker_display());
                    println!("Topic: {}", mqtt.topic);
                    println!("Enabled: {}", mqtt.enabled);
                }
            }
        }
        MqttCommands::Reconnect => {
            require_edit(auth)?;
            let result = client.reconnect_mqtt().await?;
            println!("{}", format_success(&result.message));
        }
    }

    Ok(())
}

/// Build a data-config update from command-line flags.
///
/// Sections without any flag are left out.
pub fn data_config_update(args: DataConfigArgs) -> DataConfigUpdate {
    let collector = CollectorUpdate {
        host: args.collector_host,
        port: args.collector_port,
        token: args.collector_token,
        enabled: args.collector_enabled,
    };
    let mqtt = MqttUpdate {
        broker_url: args.broker_url,
        mqtt_host: args.mqtt_host,
        mqtt_port: args.mqtt_port,
        topic: args.mqtt_topic,
        enabled: args.mqtt_enabled,
    };
    let database = DatabaseUpdate {
        host: args.db_host,
        port: args.db_port,
        user: args.db_user,
        password: args.db_password,
        name: args.db_name,
        driver: None,
    };

    let has_collector = collector.host.is_some()
        || collector.port.is_some()
        || collector.token.is_some()
        || collector.enabled.is_some();
    let has_mqtt = mqtt.broker_url.is_some()
        || mqtt.mqtt_host.is_some()
        || mqtt.mqtt_port.is_some()
        || mqtt.topic.is_some()
        || mqtt.enabled.is_some();
    let has_database = database.host.is_some()
        || database.port.is_some()
        || database.user.is_some()
        || database.password.is_some()
        || database.name.is_some();

    DataConfigUpdate {
        collector: has_collector.then_some(collector),
        mqtt: has_mqtt.then_some(mqtt),
        database: has_database.then_some(database),
    }
}

/// Handle data-config commands
pub async fn handle_data_config<S: SessionStorage>(
    client: &ScadaClient,
    auth: &mut AuthService<S>,
    command: DataConfigCommands,
    format: &OutputFormat,
) -> Result<()> {
    let config = match command {
        DataConfigCommands::Show => client.get_data_config().await?,
        DataConfigCommands::Set(args) => {
            require_edit(auth)?;
            let saved = client.save_data_config(&data_config_update(args)).await?;
            println!("{}", format_success("Data configuration saved"));
            saved
        }
    };

    match format {
        OutputFormat::Json => print_json(&config)?,
        OutputFormat::Table => {
            println!("Collector: {}", config.collector.base_url());
            println!("Collector enabled: {}", config.collector.enabled);
            println!("MQTT broker: {}", config.mqtt.broker_display());
            println!("MQTT topic: {}", config.mqtt.topic);
            println!("MQTT enabled: {}", config.mqtt.enabled);
            println!(
                "Database: {}@{}:{}/{} ({})",
                config.database.user,
                config.database.host,
                config.database.port,
                config.database.name,
                config.database.driver
            );
        }
    }

    Ok(())
}

/// Handle test commands
pub async fn handle_test(
    client: &ScadaClient,
    command: TestCommands,
    format: &OutputFormat,
) -> Result<()> {
    let (name, probe) = match command {
        TestCommands::Collector { host, port, token } => (
            "Collector",
            client.test_collector(&host, port, token.as_deref()).await?,
        ),
        TestCommands::Mqtt { host, port } => ("MQTT", client.test_mqtt(&host, port).await?),
        TestCommands::Database { host, port } => {
            ("Database", client.test_database(&host, port).await?)
        }
    };

    println!("{}", format::format_probe(name, &probe, &format.into())?);
    Ok(())
}

/// Handle telemetry commands
pub async fn handle_telemetry(
    client: &ScadaClient,
    command: TelemetryCommands,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        TelemetryCommands::Machines => {
            let machines = client.connected_machines().await?;
            println!("{}", format::format_machines(&machines, &format.into())?);
        }
        TelemetryCommands::Values => {
            let values = client.sensor_values().await?;
            println!("{}", format::format_sensor_values(&values, &format.into())?);
        }
        TelemetryCommands::Stats => {
            let stats = client.mqtt_stats().await?;
            match format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Table => {
                    println!("Broker: {}", stats.broker);
                    println!("Topic: {}", stats.topic);
                    println!("Connected: {}", stats.connected);
                    println!("Machines: {}", stats.stats.machine_count);
                    println!("Sensors: {}", stats.stats.sensor_count);
                    println!("Messages: {}", stats.stats.total_messages);
                    println!("Uptime: {}s", stats.stats.uptime);
                }
            }
        }
    }

    Ok(())
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    config_path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => match format {
            OutputFormat::Json => print_json(current_config)?,
            OutputFormat::Table => {
                println!("CLI Configuration:");
                println!("{:<20} Value", "Setting");
                println!("{}", "-".repeat(40));
                println!("{:<20} {}", "Server URL", current_config.server_url);
                println!("{:<20} {}", "Output Format", current_config.output_format);
                println!("{:<20} {}", "Verbose", current_config.verbose);
                println!("{:<20} {}s", "Timeout", current_config.timeout);
                println!("{:<20} {}", "Config File", config_path.display());
            }
        },
        ConfigCommands::Set { key, value } => {
            let mut config = CliConfig::load_from(config_path)?;
            set_config_value(&mut config, &key, &value)?;
            config.save_to(config_path)?;
            println!("{}", format_success(&format!("Set {} = {}", key, value)));
        }
        ConfigCommands::Reset => {
            CliConfig::default().save_to(config_path)?;
            println!("{}", format_success("Configuration reset to defaults"));
        }
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockServer;
    use scada_core::auth::MemoryStorage;
    use serde_json::json;
    use std::time::Duration;

    fn logged_in() -> AuthService<MemoryStorage> {
        let mut auth = AuthService::new(MemoryStorage::new());
        auth.login(&Credentials::new("admin", "admin123")).unwrap();
        auth
    }

    async fn client() -> (MockServer, ScadaClient) {
        let (server, url) = MockServer::new().start().await.unwrap();
        let client = ScadaClient::with_config(url, 5, 1, Duration::from_millis(10)).unwrap();
        (server, client)
    }

    #[test]
    fn test_parse_fields_types() {
        let record = parse_fields(&[
            "name=Main".to_string(),
            "port=8080".to_string(),
            "enabled=true".to_string(),
            "tags=[\"a\",\"b\"]".to_string(),
            "url=http://host:1/x?y=z".to_string(),
        ])
        .unwrap();

        assert_eq!(record.get("name"), Some(&json!("Main")));
        assert_eq!(record.get("port"), Some(&json!(8080)));
        assert_eq!(record.get("enabled"), Some(&json!(true)));
        assert_eq!(record.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(record.get("url"), Some(&json!("http://host:1/x?y=z")));
    }

    #[test]
    fn test_parse_fields_rejects_bad_input() {
        assert!(parse_fields(&["novalue".to_string()]).is_err());
        assert!(parse_fields(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_require_edit() {
        let mut anonymous = AuthService::new(MemoryStorage::new());
        let err = require_edit(&mut anonymous).unwrap_err();
        assert!(err.to_string().contains("Not logged in"));

        assert!(require_edit(&mut logged_in()).is_ok());
    }

    #[test]
    fn test_data_config_update_omits_untouched_sections() {
        let update = data_config_update(DataConfigArgs {
            mqtt_host: Some("broker".to_string()),
            mqtt_port: Some(1884),
            ..Default::default()
        });

        assert!(update.collector.is_none());
        assert!(update.database.is_none());
        let mqtt = update.mqtt.unwrap();
        assert_eq!(mqtt.mqtt_host.as_deref(), Some("broker"));
        assert_eq!(mqtt.mqtt_port, Some(1884));
    }

    #[tokio::test]
    async fn test_backend_set_requires_login() {
        let (server, client) = client().await;
        let mut auth = AuthService::new(MemoryStorage::new());

        let result = handle_backend(
            &client,
            &mut auth,
            BackendCommands::Set {
                id: "main".to_string(),
                fields: vec!["url=http://b".to_string()],
            },
            &OutputFormat::Json,
        )
        .await;

        assert!(result.is_err());
        assert!(server.state().backends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_set_and_remove() {
        let (server, client) = client().await;
        let mut auth = logged_in();

        handle_backend(
            &client,
            &mut auth,
            BackendCommands::Set {
                id: "main".to_string(),
                fields: vec!["url=http://b".to_string(), "timeout=5".to_string()],
            },
            &OutputFormat::Json,
        )
        .await
        .unwrap();

        {
            let backends = server.state().backends.lock().unwrap();
            assert_eq!(backends.len(), 1);
            assert_eq!(backends[0].get("timeout"), Some(&json!(5)));
        }

        handle_backend(
            &client,
            &mut auth,
            BackendCommands::Remove {
                id: "main".to_string(),
            },
            &OutputFormat::Json,
        )
        .await
        .unwrap();

        assert!(server.state().backends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plc_update_unknown_id() {
        let (_server, client) = client().await;
        let mut auth = logged_in();

        let err = handle_plc(
            &client,
            &mut auth,
            PlcCommands::Update {
                id: "99".to_string(),
                fields: vec!["ip=10.0.0.99".to_string()],
            },
            &OutputFormat::Json,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("PLC not found: 99"));
    }

    #[test]
    fn test_read_inventory_file() {
        let dir = tempfile::TempDir::new().unwrap();

        let yaml = dir.path().join("inventory.yaml");
        std::fs::write(&yaml, "plcs:\n  - id: 1\n    code: PLC-1\n").unwrap();
        let update = read_inventory_file(&yaml).unwrap();
        assert_eq!(update.plcs.unwrap().len(), 1);
        assert!(update.sensors.is_none());

        let json = dir.path().join("inventory.json");
        std::fs::write(&json, r#"{"sensors": [{"id": "s1"}]}"#).unwrap();
        assert_eq!(read_inventory_file(&json).unwrap().sensors.unwrap().len(), 1);

        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "other: 1\n").unwrap();
        assert!(read_inventory_file(&empty).is_err());
    }

    #[test]
    fn test_config_set_and_reset() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cli.toml");
        let current = CliConfig::default();

        handle_config(
            ConfigCommands::Set {
                key: "timeout".to_string(),
                value: "42".to_string(),
            },
            &current,
            &path,
            &OutputFormat::Table,
        )
        .unwrap();
        assert_eq!(CliConfig::load_from(&path).unwrap().timeout, 42);

        handle_config(ConfigCommands::Reset, &current, &path, &OutputFormat::Table).unwrap();
        assert_eq!(CliConfig::load_from(&path).unwrap(), CliConfig::default());
    }
}
