#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gridrest_core::RecordingDiagnostics;
use gridrest_domain::{ColumnType, ConnectionConfig};
use gridrest_infra::GridClient;
use serde_json::{json, Value as JsonValue};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client wired to a mock server, with a recording diagnostics sink.
pub struct TestClient {
    pub server: MockServer,
    pub client: GridClient,
    pub diagnostics: Arc<RecordingDiagnostics>,
}

impl TestClient {
    /// Start a mock server and connect a client allowing `attempts` total
    /// attempts per call with a 5ms base delay.
    pub async fn start(attempts: u32) -> Self {
        let server = MockServer::start().await;
        let config = ConnectionConfig::new(server.uri(), "admin", "admin")
            .retry_attempts(attempts)
            .retry_delay(Duration::from_millis(5))
            .timeout(Duration::from_secs(2));
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let client = GridClient::with_diagnostics(config, diagnostics.clone())
            .expect("client should be created");

        Self { server, client, diagnostics }
    }

    /// Serve `GET /containers/{name}/info` with the given columns.
    pub async fn mount_schema(&self, name: &str, columns: &[(&str, ColumnType)]) {
        Mock::given(method("GET"))
            .and(path(format!("/containers/{name}/info")))
            .respond_with(ResponseTemplate::new(200).set_body_json(container_info_json(name, columns)))
            .mount(&self.server)
            .await;
    }

    /// Bodies of every request received on `request_path`, in order.
    pub async fn bodies_for(&self, request_path: &str) -> Vec<JsonValue> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == request_path)
            .map(|r| serde_json::from_slice(&r.body).expect("request body should be JSON"))
            .collect()
    }
}

pub fn container_info_json(name: &str, columns: &[(&str, ColumnType)]) -> JsonValue {
    json!({
        "container_name": name,
        "container_type": "COLLECTION",
        "rowkey": true,
        "columns": columns
            .iter()
            .map(|(column, kind)| json!({ "name": column, "type": kind.as_str() }))
            .collect::<Vec<_>>(),
    })
}

pub fn users_columns() -> Vec<(&'static str, ColumnType)> {
    vec![("id", ColumnType::Integer), ("name", ColumnType::String)]
}
