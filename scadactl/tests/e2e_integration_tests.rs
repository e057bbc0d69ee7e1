//! End-to-End Integration Tests for the SCADA CLI and Server
//!
//! These tests spawn an actual `scadad` process with a temporary data
//! directory and run `scadactl` commands against it, testing the complete
//! path from CLI commands through the REST API to the YAML documents.
//!
//! Both binaries are built and run through cargo, so the first test to start
//! pays for the build.

use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

/// Test configuration
const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
const SERVER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A local port with nothing listening on it.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .unwrap_or(18000)
}

/// E2E Test harness that manages server lifecycle
pub struct E2ETestHarness {
    server_process: Arc<Mutex<Option<Child>>>,
    server_port: u16,
    server_url: String,
    temp_dir: TempDir,
}

impl Default for E2ETestHarness {
    fn default() -> Self {
        let server_port = free_port();
        let server_url = format!("http://127.0.0.1:{}", server_port);
        let temp_dir = tempfile::tempdir().unwrap();

        Self {
            server_process: Arc::new(Mutex::new(None)),
            server_port,
            server_url,
            temp_dir,
        }
    }
}

impl E2ETestHarness {
    fn data_dir(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    fn session_path(&self) -> PathBuf {
        self.temp_dir.path().join("session.json")
    }

    /// Start the server without an MQTT listener
    pub async fn start_server(&self) -> Result<()> {
        let mut process_guard = self.server_process.lock().await;

        println!("Starting server on port {}", self.server_port);

        // The collector points at a closed port so proxied calls fail fast
        let config_content = format!(
            r#"data_dir = "{}"

[server]
hostname = "127.0.0.1"
port = {}
request_timeout_secs = 2

[collector]
probe_timeout_secs = 1
history_timeout_secs = 2
status_timeout_secs = 1
"#,
            self.data_dir().display(),
            self.server_port
        );
        let config_path = self.temp_dir.path().join("server.toml");
        std::fs::write(&config_path, config_content)?;

        let child = Command::new("cargo")
            .args([
                "run",
                "-p",
                "scadad",
                "--bin",
                "scadad",
                "--",
                "--no-mqtt",
                "--config",
                &config_path.to_string_lossy(),
                "--port",
                &self.server_port.to_string(),
                "--bind",
                "127.0.0.1",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        *process_guard = Some(child);

        let start_time = std::time::Instant::now();
        let mut last_error = String::new();

        while start_time.elapsed() < SERVER_STARTUP_TIMEOUT {
            if let Ok(response) = self.check_server_info().await {
                if response.status().is_success() {
                    return Ok(());
                }
                last_error = format!("HTTP status: {}", response.status());
            } else if let Some(child) = process_guard.as_mut() {
                match child.try_wait() {
                    Ok(Some(status)) => {
                        anyhow::bail!("Server process exited early with status {}", status);
                    }
                    Ok(None) => {
                        last_error = "Server process running but not responding".to_string();
                    }
                    Err(e) => {
                        last_error = format!("Error checking process status: {}", e);
                    }
                }
            }
            sleep(Duration::from_millis(100)).await;
        }

        if let Some(child) = process_guard.as_mut() {
            let _ = child.kill();
        }

        anyhow::bail!(
            "Server failed to start within {} seconds. Last error: {}",
            SERVER_STARTUP_TIMEOUT.as_secs(),
            last_error
        );
    }

    /// Check if server is responding
    async fn check_server_info(&self) -> Result<reqwest::Response> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(1000))
            .build()?;

        client
            .get(format!("{}/", self.server_url))
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Info check failed: {}", e))
    }

    /// Stop the server
    pub async fn stop_server(&self) -> Result<()> {
        let mut process_guard = self.server_process.lock().await;
        if let Some(mut child) = process_guard.take() {
            let _ = child.kill();

            let waited = timeout(SERVER_SHUTDOWN_TIMEOUT, async {
                loop {
                    match child.try_wait() {
                        Ok(Some(_)) | Err(_) => break,
                        Ok(None) => sleep(Duration::from_millis(100)).await,
                    }
                }
            })
            .await;

            if waited.is_err() {
                println!("Server shutdown timeout, forcing kill");
                let _ = child.kill();
            }
        }

        Ok(())
    }

    /// Run a CLI command and return the output
    pub async fn run_cli_command(&self, args: &[&str]) -> Result<std::process::Output> {
        let session = self.session_path().to_string_lossy().into_owned();
        let mut cmd_args = vec![
            "run",
            "-p",
            "scadactl",
            "--bin",
            "scadactl",
            "--",
            "--server",
            &self.server_url,
            "--no-config",
            "--session",
            &session,
        ];
        cmd_args.extend(args);

        let output = timeout(COMMAND_TIMEOUT, async {
            Command::new("cargo")
                .args(&cmd_args)
                .env_remove("SCADA_SERVER")
                .env_remove("SCADA_FORMAT")
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output()
        })
        .await??;

        Ok(output)
    }

    /// Run a CLI command and expect success, returning stdout
    pub async fn run_cli_success(&self, args: &[&str]) -> Result<String> {
        let output = self.run_cli_command(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            anyhow::bail!(
                "CLI command failed with status {}: stderr: {}, stdout: {}",
                output.status,
                stderr,
                stdout
            );
        }

        Ok(String::from_utf8(output.stdout)?)
    }

    /// Run a CLI command and expect failure
    pub async fn run_cli_expect_failure(&self, args: &[&str]) -> Result<String> {
        let output = self.run_cli_command(args).await?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            anyhow::bail!("Expected CLI command to fail, but it succeeded: {}", stdout);
        }

        Ok(String::from_utf8(output.stderr)?)
    }

    /// Run a CLI command with JSON output and parse it
    pub async fn run_cli_json(&self, args: &[&str]) -> Result<Value> {
        let mut json_args = vec!["--format", "json"];
        json_args.extend(args);
        let output = self.run_cli_success(&json_args).await?;
        serde_json::from_str(&output)
            .map_err(|e| anyhow::anyhow!("Failed to parse JSON output: {}: {}", e, output))
    }
}

impl Drop for E2ETestHarness {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.server_process.try_lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.kill();
            }
        }
    }
}

#[tokio::test]
async fn test_e2e_server_startup_and_info() -> Result<()> {
    let harness = E2ETestHarness::default();
    harness.start_server().await?;

    let output = harness.run_cli_success(&["info"]).await?;
    assert!(
        output.contains("SCADA Configuration Server"),
        "Output should name the server: {}",
        output
    );

    let info = harness.run_cli_json(&["info"]).await?;
    assert_eq!(info["websocket"], "/mqtt-ws");

    // Defaults are written on first start
    for name in ["config.yaml", "inventory.yaml", "collector.yaml", "data.yaml"] {
        assert!(harness.data_dir().join(name).exists(), "{} missing", name);
    }

    harness.stop_server().await?;
    Ok(())
}

#[tokio::test]
async fn test_e2e_backend_edit_requires_login() -> Result<()> {
    let harness = E2ETestHarness::default();
    harness.start_server().await?;

    let error_output = harness
        .run_cli_expect_failure(&["backend", "set", "main", "url=http://b"])
        .await?;
    assert!(
        error_output.contains("Not logged in"),
        "Should require login: {}",
        error_output
    );

    harness
        .run_cli_success(&["login", "--password", "admin123"])
        .await?;
    harness
        .run_cli_success(&["backend", "set", "main", "url=http://b", "weight=2"])
        .await?;

    let backends = harness.run_cli_json(&["backend", "list"]).await?;
    let backends = backends.as_array().cloned().unwrap_or_default();
    assert_eq!(backends.len(), 1);
    assert_eq!(backends[0]["id"], "main");
    assert_eq!(backends[0]["weight"], 2);

    let yaml = std::fs::read_to_string(harness.data_dir().join("config.yaml"))?;
    assert!(yaml.contains("http://b"));

    harness.run_cli_success(&["backend", "remove", "main"]).await?;
    let backends = harness.run_cli_json(&["backend", "list"]).await?;
    assert_eq!(backends.as_array().map(Vec::len), Some(0));

    harness.run_cli_success(&["logout"]).await?;
    harness.run_cli_expect_failure(&["whoami"]).await?;

    harness.stop_server().await?;
    Ok(())
}

#[tokio::test]
async fn test_e2e_login_rejects_bad_password() -> Result<()> {
    let harness = E2ETestHarness::default();

    let error_output = harness
        .run_cli_expect_failure(&["login", "--password", "nope"])
        .await?;
    assert!(
        error_output.contains("Invalid username or password"),
        "Should reject credentials: {}",
        error_output
    );
    assert!(!harness.session_path().exists());

    Ok(())
}

#[tokio::test]
async fn test_e2e_inventory_stats_and_errors() -> Result<()> {
    let harness = E2ETestHarness::default();
    harness.start_server().await?;

    let stats = harness.run_cli_json(&["inventory", "stats"]).await?;
    assert_eq!(stats["machines"], 0);
    assert_eq!(stats["plcs"], 0);
    assert_eq!(stats["sensors"], 0);

    harness
        .run_cli_success(&["login", "--password", "admin123"])
        .await?;
    let error_output = harness
        .run_cli_expect_failure(&["plc", "update", "42", "ip=10.0.0.42"])
        .await?;
    assert!(
        error_output.contains("not found"),
        "Should report missing PLC: {}",
        error_output
    );

    harness.stop_server().await?;
    Ok(())
}

#[tokio::test]
async fn test_e2e_data_config_round_trip() -> Result<()> {
    let harness = E2ETestHarness::default();
    harness.start_server().await?;

    harness
        .run_cli_success(&["login", "--password", "admin123"])
        .await?;
    harness
        .run_cli_success(&[
            "data-config",
            "set",
            "--collector-host",
            "127.0.0.1",
            "--mqtt-host",
            "broker.plant",
            "--mqtt-port",
            "1884",
        ])
        .await?;

    let config = harness.run_cli_json(&["data-config", "show"]).await?;
    assert_eq!(config["mqtt"]["mqtt_host"], "broker.plant");
    assert_eq!(config["mqtt"]["mqtt_port"], 1884);
    assert_eq!(config["database"]["host"], "127.0.0.1");

    harness.stop_server().await?;
    Ok(())
}

#[tokio::test]
async fn test_e2e_cli_server_connection_failure() -> Result<()> {
    // The server is never started
    let harness = E2ETestHarness::default();

    let error_output = harness.run_cli_expect_failure(&["info"]).await?;
    assert!(
        error_output.contains("Failed to reach"),
        "Should show connection error: {}",
        error_output
    );

    Ok(())
}
