//! Router test harness shared by the handler tests

use super::{create_router, AppState};
use crate::config::RuntimeConfig;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use scada_core::{CollectorConfig, CollectorEndpoint, DataConfig, StaticConfig};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// A port nothing listens on.
pub(crate) fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Serve `router` on an ephemeral port and return it as a collector endpoint.
pub(crate) async fn spawn_collector(router: Router) -> CollectorEndpoint {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    CollectorEndpoint {
        host: "127.0.0.1".to_string(),
        port,
        token: "test-token".to_string(),
        enabled: true,
    }
}

pub(crate) struct TestApp {
    pub state: AppState,
    router: Router,
    _data_dir: TempDir,
}

impl TestApp {
    /// App whose collector points at a closed local port.
    pub async fn new() -> Self {
        Self::with_collector(CollectorEndpoint {
            host: "127.0.0.1".to_string(),
            port: closed_port(),
            token: String::new(),
            enabled: true,
        })
        .await
    }

    /// App whose documents point at `endpoint`, with MQTT disabled.
    pub async fn with_collector(endpoint: CollectorEndpoint) -> Self {
        let data_dir = TempDir::new().unwrap();

        let mut static_config = StaticConfig::with_data_dir(data_dir.path().join("data"));
        static_config.collector.probe_timeout_secs = 2;
        static_config.collector.status_timeout_secs = 2;
        let config = RuntimeConfig::from_static(static_config);

        let mut data = DataConfig::default();
        data.collector = endpoint.clone();
        data.mqtt.enabled = false;
        data.database.host = "127.0.0.1".to_string();
        data.database.port = closed_port();
        config.data_config().save(&data).await.unwrap();

        let collector = CollectorConfig {
            collector: endpoint,
            ..Default::default()
        };
        config.collector().save(&collector).await.unwrap();

        let state = AppState::new(config).unwrap();
        let router = create_router(state.clone());

        Self {
            state,
            router,
            _data_dir: data_dir,
        }
    }

    /// Serve the router on an ephemeral port and return the port.
    pub async fn serve(&self) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a request and decode the JSON envelope.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
