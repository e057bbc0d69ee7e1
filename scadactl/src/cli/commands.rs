//! CLI command and subcommand definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// SCADA configuration CLI
#[derive(Parser, Debug)]
#[command(name = "scadactl")]
#[command(version, about = "SCADA Configuration CLI", long_about = None)]
pub struct Cli {
    /// Server URL (overrides config file)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging (overrides config file)
    #[arg(short, long)]
    pub verbose: Option<bool>,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/scada/cli.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Session file path (default: <data dir>/session.json)
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
}

impl From<&OutputFormat> for crate::format::OutputFormat {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => crate::format::OutputFormat::Table,
            OutputFormat::Json => crate::format::OutputFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session
    Login {
        /// User name
        #[arg(short, long, default_value = "admin")]
        username: String,

        /// Password
        #[arg(short, long, env = "SCADA_PASSWORD")]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show server identification
    Info,

    /// Check server and collector health
    Health,

    /// Show collector and server versions
    Version,

    /// Show the full server status report
    Status,

    /// Probe the collector, MQTT broker and database
    Connections,

    /// Show collector database statistics
    DbStats,

    /// Show the system configuration document
    System,

    /// Backend management commands
    Backend {
        #[command(subcommand)]
        command: BackendCommands,
    },

    /// Dashboard metric commands
    Metric {
        #[command(subcommand)]
        command: MetricCommands,
    },

    /// Show the dashboard layout of a machine
    Layout {
        /// Machine ID
        machine_id: String,
    },

    /// Inventory commands
    Inventory {
        #[command(subcommand)]
        command: InventoryCommands,
    },

    /// PLC commands
    Plc {
        #[command(subcommand)]
        command: PlcCommands,
    },

    /// Sensor commands
    Sensor {
        #[command(subcommand)]
        command: SensorCommands,
    },

    /// Show the collector connection document
    Collector,

    /// Machines known to the collector
    Machine {
        #[command(subcommand)]
        command: MachineCommands,
    },

    /// MQTT listener settings
    Mqtt {
        #[command(subcommand)]
        command: MqttCommands,
    },

    /// Show or change data-source settings
    DataConfig {
        #[command(subcommand)]
        command: DataConfigCommands,
    },

    /// Test a connection from the server
    Test {
        #[command(subcommand)]
        command: TestCommands,
    },

    /// Live telemetry commands
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },

    /// Show or manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackendCommands {
    /// List backends
    List,

    /// Create or replace a backend
    Set {
        /// Backend ID
        id: String,

        /// Fields as key=value (values are parsed as JSON when possible)
        fields: Vec<String>,
    },

    /// Remove a backend
    Remove {
        /// Backend ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MetricCommands {
    /// List dashboard metrics
    List,

    /// Add a metric
    Add {
        /// Fields as key=value (values are parsed as JSON when possible)
        fields: Vec<String>,
    },

    /// Update fields of a metric
    Update {
        /// Metric ID
        id: String,

        /// Fields as key=value
        fields: Vec<String>,
    },

    /// Remove a metric
    Remove {
        /// Metric ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum InventoryCommands {
    /// Show inventory counts
    Stats,

    /// List PLCs
    Plcs,

    /// List sensors
    Sensors,

    /// Replace the local inventory with the collector's
    Sync,

    /// Replace inventory lists from a YAML or JSON file
    Import {
        /// File with any of `machines`, `plcs`, `sensors`
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum MachineCommands {
    /// List machines
    List,

    /// Show one machine
    Show {
        /// Machine ID
        id: String,
    },

    /// Show the MQTT topic mapping
    Topics {
        /// Only topics of this machine
        #[arg(long)]
        machine: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum MqttCommands {
    /// Show the listener settings
    Show,

    /// Restart the listener
    Reconnect,
}

#[derive(Subcommand, Debug)]
pub enum PlcCommands {
    /// Update fields of a PLC
    Update {
        /// PLC ID
        id: String,

        /// Fields as key=value
        fields: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SensorCommands {
    /// Update fields of a sensor
    Update {
        /// Sensor ID
        id: String,

        /// Fields as key=value
        fields: Vec<String>,
    },

    /// Show recent readings of a sensor
    History {
        /// Sensor code
        code: String,

        /// Window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
}

#[derive(Subcommand, Debug)]
pub enum DataConfigCommands {
    /// Show data-source settings
    Show,

    /// Change data-source settings; omitted fields keep their defaults
    Set(DataConfigArgs),
}

#[derive(Args, Debug, Default)]
pub struct DataConfigArgs {
    /// Collector host
    #[arg(long)]
    pub collector_host: Option<String>,

    /// Collector port
    #[arg(long)]
    pub collector_port: Option<u16>,

    /// Collector bearer token
    #[arg(long)]
    pub collector_token: Option<String>,

    /// Enable or disable the collector
    #[arg(long)]
    pub collector_enabled: Option<bool>,

    /// MQTT broker URL
    #[arg(long)]
    pub broker_url: Option<String>,

    /// MQTT host
    #[arg(long)]
    pub mqtt_host: Option<String>,

    /// MQTT port
    #[arg(long)]
    pub mqtt_port: Option<u16>,

    /// MQTT topic filter
    #[arg(long)]
    pub mqtt_topic: Option<String>,

    /// Enable or disable MQTT
    #[arg(long)]
    pub mqtt_enabled: Option<bool>,

    /// Database host
    #[arg(long)]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long)]
    pub db_port: Option<u16>,

    /// Database user
    #[arg(long)]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long)]
    pub db_name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Test a collector endpoint
    Collector {
        /// Host
        host: String,

        /// Port
        #[arg(long)]
        port: Option<u16>,

        /// Bearer token
        #[arg(long)]
        token: Option<String>,
    },

    /// Test an MQTT broker
    Mqtt {
        /// Host
        host: String,

        /// Port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Test a database endpoint
    Database {
        /// Host
        host: String,

        /// Port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TelemetryCommands {
    /// Machines seen on the MQTT feed
    Machines,

    /// Latest value of every sensor
    Values,

    /// Listener statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (server_url, output_format, verbose, timeout)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Reset configuration to defaults
    Reset,
}
