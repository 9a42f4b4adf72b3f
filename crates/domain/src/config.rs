//! Connection configuration
//!
//! Callers describe a connection with either [`ConnectionConfig`] (a plain
//! endpoint) or [`CloudConfig`] (a hosted cluster that needs routing
//! headers). Both are folded into [`ClientOptions`] and resolved exactly once
//! into an immutable [`ConnectionProfile`], which is what the request
//! executor holds for its whole lifetime.

use std::fmt;
use std::time::Duration;

use gridrest_common::encoding::basic_auth_header;
use gridrest_common::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    CLOUD_RETRY_ATTEMPTS, CLOUD_RETRY_DELAY, CLOUD_TIMEOUT, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT, HEADER_CLUSTER, HEADER_DATABASE, HEADER_REGION,
};
use crate::errors::{GridError, Result};
use crate::utils::duration_millis;

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

fn cloud_timeout() -> Duration {
    CLOUD_TIMEOUT
}

fn cloud_retry_attempts() -> u32 {
    CLOUD_RETRY_ATTEMPTS
}

fn cloud_retry_delay() -> Duration {
    CLOUD_RETRY_DELAY
}

/// Plain endpoint configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the Web API, e.g. `http://localhost:8080/griddb/v2/cluster/dbs/public`
    pub url: String,
    pub username: String,
    pub password: String,
    /// Per-attempt timeout
    #[serde(rename = "timeout_ms", with = "duration_millis", default = "default_timeout")]
    pub timeout: Duration,
    /// Total attempts per call (initial try + retries)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay; the n-th retry waits `retry_delay * n`
    #[serde(rename = "retry_delay_ms", with = "duration_millis", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

impl ConnectionConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Hosted-cluster configuration. Requires HTTPS and routing identifiers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub cluster: String,
    pub database: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(rename = "timeout_ms", with = "duration_millis", default = "cloud_timeout")]
    pub timeout: Duration,
    #[serde(default = "cloud_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(rename = "retry_delay_ms", with = "duration_millis", default = "cloud_retry_delay")]
    pub retry_delay: Duration,
}

impl CloudConfig {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        cluster: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            cluster: cluster.into(),
            database: database.into(),
            region: None,
            timeout: CLOUD_TIMEOUT,
            retry_attempts: CLOUD_RETRY_ATTEMPTS,
            retry_delay: CLOUD_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cluster", &self.cluster)
            .field("database", &self.database)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Either configuration shape, as accepted by client constructors and
/// configuration files (`kind = "standard"` / `kind = "cloud"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientOptions {
    Standard(ConnectionConfig),
    Cloud(CloudConfig),
}

impl From<ConnectionConfig> for ClientOptions {
    fn from(config: ConnectionConfig) -> Self {
        Self::Standard(config)
    }
}

impl From<CloudConfig> for ClientOptions {
    fn from(config: CloudConfig) -> Self {
        Self::Cloud(config)
    }
}

/// Header strategy selected at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deployment {
    /// No extra headers
    Standard,
    /// `cluster`, `database` and optional `region` on every call
    Cloud { cluster: String, database: String, region: Option<String> },
}

impl Deployment {
    /// Headers injected into every request.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Standard => Vec::new(),
            Self::Cloud { cluster, database, region } => {
                let mut headers =
                    vec![(HEADER_CLUSTER, cluster.as_str()), (HEADER_DATABASE, database.as_str())];
                if let Some(region) = region {
                    headers.push((HEADER_REGION, region.as_str()));
                }
                headers
            }
        }
    }

    fn validate(&self, url: &Url) -> Result<()> {
        match self {
            Self::Standard => Ok(()),
            Self::Cloud { cluster, database, .. } => {
                if cluster.trim().is_empty() {
                    return Err(GridError::Config("cloud connections require a cluster".into()));
                }
                if database.trim().is_empty() {
                    return Err(GridError::Config("cloud connections require a database".into()));
                }
                if url.scheme() != "https" {
                    return Err(GridError::Config(format!(
                        "cloud connections require an https endpoint, got {}",
                        url.scheme()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Immutable, validated connection parameters
#[derive(Clone)]
pub struct ConnectionProfile {
    base_url: String,
    auth_header: String,
    timeout: Duration,
    retry: RetryPolicy,
    deployment: Deployment,
}

impl ConnectionProfile {
    /// Validate options and derive the profile.
    ///
    /// # Errors
    ///
    /// Returns `GridError::Config` when the URL is not an absolute
    /// http/https URL, a credential is empty, or cloud settings are
    /// incomplete.
    pub fn resolve(options: impl Into<ClientOptions>) -> Result<Self> {
        let options: ClientOptions = options.into();
        let (url, username, password, timeout, attempts, delay, deployment) = match options {
            ClientOptions::Standard(c) => (
                c.url,
                c.username,
                c.password,
                c.timeout,
                c.retry_attempts,
                c.retry_delay,
                Deployment::Standard,
            ),
            ClientOptions::Cloud(c) => (
                c.url,
                c.username,
                c.password,
                c.timeout,
                c.retry_attempts,
                c.retry_delay,
                Deployment::Cloud { cluster: c.cluster, database: c.database, region: c.region },
            ),
        };

        let parsed = parse_endpoint(&url)?;
        if username.is_empty() {
            return Err(GridError::Config("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(GridError::Config("password must not be empty".into()));
        }
        deployment.validate(&parsed)?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            auth_header: basic_auth_header(&username, &password),
            timeout,
            retry: RetryPolicy::linear(attempts, delay),
            deployment,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/containers`.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("base_url", &self.base_url)
            .field("auth_header", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("deployment", &self.deployment)
            .finish()
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    if raw.trim().is_empty() {
        return Err(GridError::Config("endpoint URL must not be empty".into()));
    }
    let url = Url::parse(raw)
        .map_err(|e| GridError::Config(format!("invalid endpoint URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GridError::Config(format!(
            "endpoint URL must use http or https, got {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(GridError::Config(format!("endpoint URL {raw:?} has no host")));
    }
    Ok(url)
}
