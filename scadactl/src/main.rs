//! SCADA CLI
//!
//! Command-line interface for the SCADA configuration server.

use anyhow::Result;
use clap::Parser;
use scada_core::{default_session_path, AuthService};
use scadactl::cli::{
    generate_completion, handle_backend, handle_collector, handle_config, handle_connections,
    handle_data_config, handle_db_stats, handle_health, handle_info, handle_inventory,
    handle_layout, handle_machine, handle_metric, handle_mqtt, handle_plc, handle_sensor, handle_session, handle_status,
    handle_system, handle_telemetry, handle_test, handle_version, Cli, Commands, OutputFormat,
};
use scadactl::client::ScadaClient;
use scadactl::config::CliConfig;
use scadactl::session::FileStorage;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => CliConfig::default_path()?,
    };

    // Build configuration using priority chain: CLI args > env > file > defaults
    let mut builder = CliConfig::builder();

    if let Some(ref server) = cli.server {
        builder = builder.with_server_url(server)?;
    }
    if let Some(ref format) = cli.format {
        let format_str = match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        };
        builder = builder.with_output_format(format_str)?;
    }
    if let Some(verbose) = cli.verbose {
        builder = builder.with_verbose(verbose);
    }

    builder = builder.with_env_overrides();

    if !cli.no_config {
        builder = builder.with_config_file(&config_path)?;
    }

    // Build final configuration with validation
    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            if cli.verbose.unwrap_or(false) {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(1);
        }
    };

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let verbose = config.verbose;

    let session_path = cli.session.clone().unwrap_or_else(default_session_path);

    if verbose {
        eprintln!("Verbose mode enabled");
        eprintln!("Server URL: {}", config.server_url);
        eprintln!("Output format: {:?}", output_format);
        eprintln!("Session file: {}", session_path.display());
    }

    let client = match ScadaClient::with_config(
        config.server_url.clone(),
        config.timeout,
        3,
        std::time::Duration::from_millis(500),
    ) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: Cannot create client for {}", config.server_url);
            eprintln!("Client error: {}", e);
            std::process::exit(1);
        }
    };

    let mut auth = AuthService::new(FileStorage::open(&session_path));

    // Execute commands
    let result = match cli.command {
        ref command @ (Commands::Login { .. } | Commands::Logout | Commands::Whoami) => {
            handle_session(&mut auth, command, &output_format)
        }
        Commands::Info => handle_info(&client, &output_format).await,
        Commands::Health => handle_health(&client, &output_format).await,
        Commands::Version => handle_version(&client, &output_format).await,
        Commands::Status => handle_status(&client, &output_format).await,
        Commands::Connections => handle_connections(&client, &output_format).await,
        Commands::DbStats => handle_db_stats(&client, &output_format).await,
        Commands::System => handle_system(&client, &output_format).await,
        Commands::Backend { command } => {
            handle_backend(&client, &mut auth, command, &output_format).await
        }
        Commands::Metric { command } => {
            handle_metric(&client, &mut auth, command, &output_format).await
        }
        Commands::Layout { machine_id } => {
            handle_layout(&client, &machine_id, &output_format).await
        }
        Commands::Inventory { command } => {
            handle_inventory(&client, &mut auth, command, &output_format).await
        }
        Commands::Plc { command } => handle_plc(&client, &mut auth, command, &output_format).await,
        Commands::Sensor { command } => {
            handle_sensor(&client, &mut auth, command, &output_format).await
        }
        Commands::Collector => handle_collector(&client, &output_format).await,
        Commands::Machine { command } => handle_machine(&client, command, &output_format).await,
        Commands::Mqtt { command } => {
            handle_mqtt(&client, &mut auth, command, &output_format).await
        }
        Commands::DataConfig { command } => {
            handle_data_config(&client, &mut auth, command, &output_format).await
        }
        Commands::Test { command } => handle_test(&client, command, &output_format).await,
        Commands::Telemetry { command } => {
            handle_telemetry(&client, command, &output_format).await
        }
        Commands::Config { command } => {
            handle_config(command, &config, &config_path, &output_format)
        }
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
