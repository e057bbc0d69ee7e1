//! SCADA CLI Library
//!
//! This library provides the core functionality for the `scadactl` tool.
//!
//! # Public API
//!
//! The primary public API is the [`client::ScadaClient`] which provides
//! programmatic access to the SCADA configuration server. Configuration
//! types are available via [`config::CliConfig`] and
//! [`config::ConfigBuilder`], and [`session::FileStorage`] keeps the login
//! session between runs.
//!
//! ```no_run
//! use scadactl::client::ScadaClient;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ScadaClient::with_config(
//!     "http://localhost:3002".to_string(),
//!     10,  // timeout in seconds
//!     3,   // max retries
//!     Duration::from_millis(500),  // initial retry delay
//! )?;
//!
//! let stats = client.inventory_stats().await?;
//! println!("{} sensors", stats.counts.sensors);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP client for communicating with the SCADA server.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// File-backed login session.
pub mod session;

#[cfg(test)]
pub mod test_utils;
