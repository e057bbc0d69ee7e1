//! HTTP client for the external collector service
//!
//! Every request carries the configured bearer token and its own timeout.
//! Non-success answers become [`ScadaError::Upstream`] so handlers can relay
//! the collector's status code.

use reqwest::{RequestBuilder, StatusCode};
use scada_core::api::{ProbeResult, ProbeStatus};
use scada_core::{CollectorEndpoint, Record, Result, ScadaError};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Client for the collector's REST API
#[derive(Clone)]
pub(crate) struct CollectorClient {
    http: reqwest::Client,
}

impl CollectorClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scadad/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScadaError::Collector(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    fn request(
        &self,
        endpoint: &CollectorEndpoint,
        path: &str,
        timeout: Duration,
    ) -> RequestBuilder {
        let url = format!("{}{}", endpoint.base_url(), path);
        debug!("Collector request: GET {}", url);

        let builder = self.http.get(url).timeout(timeout);
        match endpoint.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json(
        &self,
        endpoint: &CollectorEndpoint,
        path: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<Value> {
        let response = self
            .request(endpoint, path, timeout)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Collector returned {} for {}: {}", status, path, body);
            return Err(ScadaError::Upstream {
                status: status.as_u16(),
                message: upstream_message(status, body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ScadaError::Collector(format!("Invalid JSON from {}: {}", path, e)))
    }

    /// GET `path` and decode a JSON array of records.
    pub async fn fetch_list(
        &self,
        endpoint: &CollectorEndpoint,
        path: &str,
        timeout: Duration,
    ) -> Result<Vec<Record>> {
        let value = self.get_json(endpoint, path, &[], timeout).await?;
        serde_json::from_value(value).map_err(|e| {
            ScadaError::Collector(format!("Expected a list of records from {}: {}", path, e))
        })
    }

    /// Probe `/api/health` and classify the outcome.
    pub async fn probe_health(
        &self,
        endpoint: &CollectorEndpoint,
        timeout: Duration,
    ) -> ProbeResult {
        let started = Instant::now();
        let result = self.request(endpoint, "/api/health", timeout).send().await;
        let latency = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                debug!("Collector probe failed: {}", e);
                return ProbeResult::failed(ProbeStatus::Offline, e.to_string());
            }
        };

        let status = response.status();
        if status.is_success() {
            let probe = ProbeResult::ok(ProbeStatus::Online)
                .with_latency(latency)
                .with_code(status.as_u16());
            match response.json::<Value>().await {
                Ok(data) => probe.with_data(data),
                Err(_) => probe,
            }
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ProbeResult::failed(
                ProbeStatus::AuthError,
                "Invalid or missing authentication token",
            )
            .with_latency(latency)
            .with_code(status.as_u16())
        } else {
            ProbeResult::failed(ProbeStatus::Error, format!("HTTP {}", status))
                .with_latency(latency)
                .with_code(status.as_u16())
        }
    }
}

fn transport_error(err: reqwest::Error) -> ScadaError {
    if err.is_timeout() {
        ScadaError::Timeout(format!("Collector request timed out: {}", err))
    } else {
        ScadaError::Collector(err.to_string())
    }
}

fn upstream_message(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Collector request failed")
            .to_string()
    } else {
        body
    }
}
