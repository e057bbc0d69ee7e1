//! Simple integration tests for the SCADA CLI library
//!
//! These run without a server: they cover client construction, failure
//! reporting for an unreachable server and the persisted session.

use anyhow::Result;
use scada_core::{AuthService, Credentials, Record};
use scadactl::client::ScadaClient;
use scadactl::config::CliConfig;
use scadactl::session::FileStorage;
use std::time::Duration;

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn test_client_creation_does_not_connect() -> Result<()> {
    let client = ScadaClient::with_config(
        "http://localhost:3002/".to_string(),
        10,
        3,
        Duration::from_millis(500),
    )?;

    assert_eq!(client.base_url(), "http://localhost:3002");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_reports_attempts() -> Result<()> {
    let client = ScadaClient::with_config(
        format!("http://127.0.0.1:{}", closed_port()),
        2,
        2,
        Duration::from_millis(10),
    )?;

    let err = client.inventory_stats().await.unwrap_err();

    assert!(
        err.to_string().contains("after 3 attempt(s)"),
        "unexpected error: {}",
        err
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_backend_id_rejected_locally() -> Result<()> {
    let client = ScadaClient::with_config(
        format!("http://127.0.0.1:{}", closed_port()),
        2,
        0,
        Duration::from_millis(10),
    )?;

    let err = client.upsert_backend(&Record::new()).await.unwrap_err();

    assert!(err.to_string().contains("Backend id cannot be empty"));
    Ok(())
}

#[test]
fn test_session_shared_between_runs() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");

    let mut first_run = AuthService::new(FileStorage::open(&path));
    assert!(first_run
        .login(&Credentials::new("admin", "wrong"))
        .is_err());
    assert!(!path.exists());

    first_run.login(&Credentials::new("admin", "admin123"))?;

    let mut second_run = AuthService::new(FileStorage::open(&path));
    let user = second_run.current_user().expect("session restored");
    assert_eq!(user.username, "admin");
    assert!(second_run.has_permission("edit_config"));
    Ok(())
}

#[test]
fn test_config_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scada").join("cli.toml");

    let config = CliConfig::builder()
        .with_server_url("http://plant-gw:3002")?
        .with_timeout(15)?
        .build()?;
    config.save_to(&path)?;

    let loaded = CliConfig::builder().with_config_file(&path)?.build()?;
    assert_eq!(loaded.server_url, "http://plant-gw:3002");
    assert_eq!(loaded.timeout, 15);
    Ok(())
}
