//! SCADA Configuration Server
//!
//! REST API server that keeps the SCADA configuration documents, proxies
//! requests to the external data collector and relays live MQTT telemetry
//! to WebSocket clients.
//!
//! # Data Sources
//!
//! The server reads four YAML documents from its data directory:
//! `config.yaml`, `inventory.yaml`, `collector.yaml` and `data.yaml`. They are
//! created with defaults on first start and re-read on every request.
//!
//! The MQTT listener subscribes to the broker configured in `collector.yaml`
//! when enabled there, otherwise to the one in `data.yaml`. Use `--no-mqtt`
//! to run without a broker.

mod api;
mod collector;
mod config;
mod diagnostics;
mod shutdown;
mod telemetry;

use anyhow::Result;
use api::AppState;
use clap::Parser;
use config::RuntimeConfig;
use scada_core::default_config_path;
use std::path::PathBuf;
use tracing::{info, warn};

/// SCADA Configuration Server
#[derive(Parser, Debug)]
#[command(name = "scadad")]
#[command(version, about = "SCADA Configuration API Server", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address (default: hostname from the config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not start the MQTT listener
    #[arg(long)]
    no_mqtt: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("SCADA Configuration Server starting...");

    // Determine config path: CLI flag > env var > default
    let config_path = args.config.unwrap_or_else(|| {
        std::env::var("SCADA_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });
    info!("Configuration file: {}", config_path.display());

    let runtime_config = RuntimeConfig::load(&config_path).await?;
    info!("Configuration loaded successfully");
    info!("  Static config: {}", config_path.display());
    info!("  Data directory: {}", runtime_config.data_dir().display());

    let server_config = &runtime_config.static_config().server;
    let bind = args.bind.unwrap_or_else(|| server_config.hostname.clone());
    let port = args.port.unwrap_or(server_config.port);
    let bind_addr = format!("{}:{}", bind, port);

    let app_state = AppState::new(runtime_config)?;

    if args.no_mqtt {
        info!("MQTT listener disabled by --no-mqtt");
    } else if !app_state.reload_mqtt().await {
        warn!("No enabled MQTT broker configured; live telemetry is off");
    }

    let mqtt = app_state.mqtt.clone();
    let app = api::create_router(app_state);

    info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("SCADA API Server listening on http://{}", bind_addr);
    info!("WebSocket telemetry on ws://{}/mqtt-ws", bind_addr);
    info!("Server ready!");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::shutdown_signal().await;
            shutdown::stop_services(&mqtt).await;
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
