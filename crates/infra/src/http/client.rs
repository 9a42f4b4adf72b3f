use std::sync::Arc;
use std::time::{Duration, Instant};

use gridrest_common::resilience::RetryDecision;
use gridrest_core::{Diagnostic, DiagnosticsSink};
use gridrest_domain::{ClientOptions, ConnectionProfile, GridError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::diagnostics::TracingDiagnostics;

/// Path of a container-scoped endpoint; the name travels as a single
/// percent-encoded segment.
pub fn container_path(name: &str, suffix: &str) -> String {
    let encoded = urlencoding::encode(name);
    if suffix.is_empty() {
        format!("/containers/{encoded}")
    } else {
        format!("/containers/{encoded}/{}", suffix.trim_start_matches('/'))
    }
}

/// Per-call knobs: body, extra headers, auth opt-out.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    body: Option<JsonValue>,
    headers: Vec<(String, String)>,
    skip_auth: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON body from an already-built value.
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// JSON body from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| GridError::InvalidInput(format!("request body is not JSON: {e}")))?;
        Ok(self.body(value))
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send the call without the `Authorization` header.
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Authenticated HTTP executor with per-attempt timeout and linear backoff.
///
/// 2xx responses are decoded and returned. 4xx responses fail immediately
/// with [`GridError::Status`]. Any other status and every transport failure
/// (timeout, refused connection, broken body) is retried until the profile's
/// attempt budget runs out, which yields [`GridError::RetriesExhausted`].
#[derive(Clone)]
pub struct RequestExecutor {
    client: ReqwestClient,
    profile: Arc<ConnectionProfile>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor").field("profile", &self.profile).finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Start building an executor over a resolved profile.
    pub fn builder(profile: ConnectionProfile) -> RequestExecutorBuilder {
        RequestExecutorBuilder::new(profile)
    }

    /// Resolve options and build an executor with the tracing diagnostics
    /// sink.
    ///
    /// # Errors
    ///
    /// Returns `GridError::Config` for invalid options.
    pub fn new(options: impl Into<ClientOptions>) -> Result<Self> {
        Self::builder(ConnectionProfile::resolve(options)?).build()
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub fn diagnostics(&self) -> Arc<dyn DiagnosticsSink> {
        Arc::clone(&self.diagnostics)
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<JsonValue> {
        self.execute(Method::GET, path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<JsonValue> {
        self.execute(Method::POST, path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<JsonValue> {
        self.execute(Method::PUT, path, options).await
    }

    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<JsonValue> {
        self.execute(Method::DELETE, path, options).await
    }

    /// `true` when the info endpoint answers, `false` on 404. Any other
    /// failure propagates.
    pub async fn container_exists(&self, name: &str) -> Result<bool> {
        match self.get(&container_path(name, "info"), RequestOptions::new()).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Perform one logical call, retrying transient failures.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let url = self.profile.endpoint(path);
        let builder = self.request(method.clone(), &url, &options)?;
        let policy = self.profile.retry_policy();
        let method_name = method.as_str().to_owned();

        let mut attempt: u32 = 1;
        loop {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                GridError::Internal(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            self.diagnostics.emit(&Diagnostic::RequestStarted {
                method: method_name.clone(),
                url: url.clone(),
                attempt,
            });

            let started = Instant::now();
            let failure = match cloned_builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    self.diagnostics.emit(&Diagnostic::ResponseReceived {
                        method: method_name.clone(),
                        url: url.clone(),
                        attempt,
                        status: status.as_u16(),
                        elapsed: started.elapsed(),
                    });

                    let body = response.text().await;
                    if status.is_client_error() {
                        // 4xx is final even when its body cannot be read.
                        return Err(GridError::Status {
                            method: method_name,
                            url,
                            status: status.as_u16(),
                            body: body.unwrap_or_default(),
                            attempts: attempt,
                        });
                    }

                    match body {
                        Ok(text) if status.is_success() => return Ok(self.decode_body(&url, text)),
                        Ok(text) => AttemptFailure {
                            cause: format!("status {status}"),
                            status: Some(status.as_u16()),
                            body: Some(text),
                        },
                        Err(err) => AttemptFailure {
                            cause: format!("failed to read response body: {err}"),
                            status: Some(status.as_u16()),
                            body: None,
                        },
                    }
                }
                Err(err) if should_retry_error(&err) => {
                    AttemptFailure { cause: describe_transport_error(&err), status: None, body: None }
                }
                Err(err) => {
                    return Err(GridError::Internal(format!("{method_name} {url}: {err}")));
                }
            };

            match policy.decide(attempt) {
                RetryDecision::RetryAfter(delay) => {
                    self.diagnostics.emit(&Diagnostic::RetryScheduled {
                        method: method_name.clone(),
                        url: url.clone(),
                        attempt,
                        delay,
                        cause: failure.cause.clone(),
                    });
                    sleep_before_retry(delay).await;
                    attempt += 1;
                }
                RetryDecision::Stop => {
                    self.diagnostics.emit(&Diagnostic::RetriesExhausted {
                        method: method_name.clone(),
                        url: url.clone(),
                        attempts: attempt,
                        cause: failure.cause.clone(),
                    });
                    return Err(GridError::RetriesExhausted {
                        method: method_name,
                        url,
                        attempts: attempt,
                        status: failure.status,
                        body: failure.body,
                        last_error: failure.cause,
                    });
                }
            }
        }
    }

    /// Build the request for one call: auth, deployment headers, caller
    /// headers, body.
    fn request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<RequestBuilder> {
        let mut headers = HeaderMap::new();

        if !options.skip_auth {
            headers.insert(AUTHORIZATION, header_value(self.profile.auth_header())?);
        }
        for (name, value) in self.profile.deployment().headers() {
            headers.insert(HeaderName::from_static(name), header_value(value)?);
        }
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GridError::InvalidInput(format!("invalid header name {name:?}: {e}"))
            })?;
            headers.insert(name, header_value(value)?);
        }

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Empty body becomes `{}`; a body that is not JSON comes back as a
    /// JSON string holding the raw text.
    fn decode_body(&self, url: &str, text: String) -> JsonValue {
        if text.trim().is_empty() {
            return JsonValue::Object(serde_json::Map::new());
        }

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                debug!(%url, error = %err, "response body is not JSON");
                self.diagnostics
                    .emit(&Diagnostic::NonJsonBody { url: url.to_owned(), bytes: text.len() });
                JsonValue::String(text)
            }
        }
    }
}

/// Builder for [`RequestExecutor`].
pub struct RequestExecutorBuilder {
    profile: ConnectionProfile,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    user_agent: String,
}

impl RequestExecutorBuilder {
    fn new(profile: ConnectionProfile) -> Self {
        Self {
            profile,
            diagnostics: None,
            user_agent: format!("gridrest/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Route diagnostic events to `sink` instead of `tracing`.
    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<RequestExecutor> {
        let client = ReqwestClient::builder()
            .timeout(self.profile.timeout())
            .user_agent(self.user_agent)
            .build()
            .map_err(|err| GridError::Internal(format!("failed to build HTTP client: {err}")))?;

        Ok(RequestExecutor {
            client,
            profile: Arc::new(self.profile),
            diagnostics: self.diagnostics.unwrap_or_else(|| Arc::new(TracingDiagnostics)),
        })
    }
}

struct AttemptFailure {
    cause: String,
    status: Option<u16>,
    body: Option<String>,
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GridError::InvalidInput(format!("invalid header value: {e}")))
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_request() || err.is_body() {
        return true;
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return true;
        }
    }
    false
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("transport error: {err}")
    }
}

async fn sleep_before_retry(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use gridrest_core::{DiagnosticLevel, RecordingDiagnostics};
    use gridrest_domain::{CloudConfig, ConnectionConfig, ErrorCategory};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn executor_for(uri: &str, attempts: u32) -> (RequestExecutor, Arc<RecordingDiagnostics>) {
        let config = ConnectionConfig::new(uri, "admin", "secret")
            .retry_attempts(attempts)
            .retry_delay(Duration::from_millis(10))
            .timeout(Duration::from_millis(300));
        let sink = Arc::new(RecordingDiagnostics::new());
        let executor = RequestExecutor::builder(ConnectionProfile::resolve(config).unwrap())
            .diagnostics(sink.clone())
            .build()
            .expect("executor");
        (executor, sink)
    }

    fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // nothing listens here any more
        format!("http://{addr}")
    }

    #[test]
    fn container_names_are_percent_encoded() {
        assert_eq!(container_path("sensors", "rows"), "/containers/sensors/rows");
        assert_eq!(container_path("a b/c", "info"), "/containers/a%20b%2Fc/info");
        assert_eq!(container_path("plain", ""), "/containers/plain");
    }

    #[tokio::test]
    async fn retries_server_error_then_succeeds() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        Mock::given(method("GET"))
            .and(path("/containers"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let (executor, sink) = executor_for(&server.uri(), 2);
        let body = executor.get("/containers", RequestOptions::new()).await.expect("response");

        assert_eq!(body, json!({ "success": true }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.retry_delays(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        for status in [400u16, 401, 404, 409, 499] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_string("rejected"))
                .expect(1)
                .mount(&server)
                .await;

            let (executor, sink) = executor_for(&server.uri(), 5);
            let err = executor
                .post("/sql/dml/query", RequestOptions::new().body(json!([])))
                .await
                .unwrap_err();

            assert_eq!(err.status(), Some(status));
            assert_eq!(err.body(), Some("rejected"));
            assert_eq!(err.attempts(), Some(1));
            assert_eq!(err.category(), ErrorCategory::Client);
            assert!(sink.retry_delays().is_empty());
        }
    }

    /// Answers every connection with a 404 whose body stops short of its
    /// declared length, then hangs up.
    async fn truncated_not_found_server() -> (String, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 100\r\n\r\nabc")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    #[tokio::test]
    async fn client_error_with_unreadable_body_is_not_retried() {
        let (url, hits) = truncated_not_found_server().await;
        let (executor, sink) = executor_for(&url, 3);

        let err = executor.get("/x", RequestOptions::new()).await.unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(err.attempts(), Some(1));
        assert_eq!(err.category(), ErrorCategory::Client);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(sink.retry_delays().is_empty());

        assert!(!executor.container_exists("gone").await.unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_error_after_retry_counts_every_attempt() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                    ResponseTemplate::new(503)
                } else {
                    ResponseTemplate::new(404).set_body_string("no such container")
                }
            })
            .mount(&server)
            .await;

        let (executor, sink) = executor_for(&server.uri(), 3);
        let err = executor.get("/containers/x/info", RequestOptions::new()).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.attempts(), Some(2));
        assert_eq!(err.body(), Some("no such container"));
        assert_eq!(sink.retry_delays(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test]
    async fn exhausted_retries_report_attempts_and_last_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(3)
            .mount(&server)
            .await;

        let (executor, sink) = executor_for(&server.uri(), 3);
        let err = executor.get("/containers", RequestOptions::new()).await.unwrap_err();

        match &err {
            GridError::RetriesExhausted { attempts, status, body, .. } => {
                assert_eq!(*attempts, 3);
                assert_eq!(*status, Some(503));
                assert_eq!(body.as_deref(), Some("busy"));
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert!(err.to_string().contains("3 attempts"));

        let delays = sink.retry_delays();
        assert_eq!(delays, vec![Duration::from_millis(10), Duration::from_millis(20)]);
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(sink.at_level(DiagnosticLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn timeouts_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let (executor, _sink) = executor_for(&server.uri(), 2);
        let err = executor.get("/containers", RequestOptions::new()).await.unwrap_err();

        assert_eq!(err.attempts(), Some(2));
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn network_failures_are_retried() {
        let (executor, sink) = executor_for(&closed_port_url(), 2);

        let err = executor.get("/containers", RequestOptions::new()).await.unwrap_err();

        assert_eq!(err.attempts(), Some(2));
        assert!(err.is_retryable());
        assert_eq!(sink.retry_delays().len(), 1);
    }

    #[tokio::test]
    async fn attaches_basic_auth_unless_opted_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/with-auth"))
            .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": 1 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/without-auth"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let (executor, _sink) = executor_for(&server.uri(), 1);
        executor.get("/with-auth", RequestOptions::new()).await.expect("authenticated call");
        executor
            .get("/without-auth", RequestOptions::new().without_auth())
            .await
            .expect("anonymous call");

        let requests = server.received_requests().await.unwrap();
        let anonymous = requests.iter().find(|r| r.url.path() == "/without-auth").unwrap();
        assert!(anonymous.headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn sends_json_body_and_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/containers/users/rows"))
            .and(header("x-trace", "abc"))
            .and(body_json(json!([[1, "Alice"]])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let (executor, _sink) = executor_for(&server.uri(), 1);
        let options =
            RequestOptions::new().json(&json!([[1, "Alice"]])).unwrap().header("x-trace", "abc");
        let body = executor.put(&container_path("users", "rows"), options).await.unwrap();

        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn empty_body_decodes_to_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (executor, _sink) = executor_for(&server.uri(), 1);
        let body = executor.delete("/containers/old", RequestOptions::new()).await.unwrap();

        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn plain_text_body_is_returned_raw_with_warning() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let (executor, sink) = executor_for(&server.uri(), 1);
        let body = executor.get("/ping", RequestOptions::new()).await.unwrap();

        assert_eq!(body, JsonValue::String("pong".into()));
        assert_eq!(
            sink.at_level(DiagnosticLevel::Warn),
            vec![Diagnostic::NonJsonBody { url: format!("{}/ping", server.uri()), bytes: 4 }]
        );
    }

    #[tokio::test]
    async fn container_exists_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/containers/present/info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "container_name": "present" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/containers/absent/info"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/containers/forbidden/info"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let (executor, _sink) = executor_for(&server.uri(), 1);

        assert!(executor.container_exists("present").await.unwrap());
        assert!(!executor.container_exists("absent").await.unwrap());
        assert_eq!(executor.container_exists("forbidden").await.unwrap_err().status(), Some(403));
    }

    #[tokio::test]
    async fn cloud_profile_injects_routing_headers() {
        let config = CloudConfig::new("https://cloud.example.com/griddb/v2", "u", "p", "c1", "db1")
            .region("eu-west");
        let executor = RequestExecutor::new(config).unwrap();

        let url = executor.profile().endpoint("/containers");
        let request = executor
            .request(Method::GET, &url, &RequestOptions::new())
            .unwrap()
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers.get("cluster").unwrap(), "c1");
        assert_eq!(headers.get("database").unwrap(), "db1");
        assert_eq!(headers.get("region").unwrap(), "eu-west");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dTpw");
    }
}
