//! Configuration loader
//!
//! Builds [`ClientOptions`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If incomplete, falls back to loading from file
//! 4. Probes multiple paths for config files (JSON or TOML)
//!
//! ## Environment Variables
//! - `GRIDREST_URL`: Web API base URL (required)
//! - `GRIDREST_USERNAME` / `GRIDREST_PASSWORD`: credentials (required)
//! - `GRIDREST_TIMEOUT_MS`: per-attempt timeout in milliseconds
//! - `GRIDREST_RETRY_ATTEMPTS`: total attempts per call
//! - `GRIDREST_RETRY_DELAY_MS`: base retry delay in milliseconds
//! - `GRIDREST_CLUSTER` / `GRIDREST_DATABASE`: when both are set the cloud
//!   variant is selected
//! - `GRIDREST_REGION`: optional cloud region
//!
//! ## File Format
//! ```toml
//! kind = "standard"
//! url = "http://localhost:8080/griddb/v2/myCluster/dbs/public"
//! username = "admin"
//! password = "admin"
//! timeout_ms = 30000
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use gridrest_domain::{ClientOptions, CloudConfig, ConnectionConfig, GridError, Result};

pub const ENV_URL: &str = "GRIDREST_URL";
pub const ENV_USERNAME: &str = "GRIDREST_USERNAME";
pub const ENV_PASSWORD: &str = "GRIDREST_PASSWORD";
pub const ENV_TIMEOUT_MS: &str = "GRIDREST_TIMEOUT_MS";
pub const ENV_RETRY_ATTEMPTS: &str = "GRIDREST_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "GRIDREST_RETRY_DELAY_MS";
pub const ENV_CLUSTER: &str = "GRIDREST_CLUSTER";
pub const ENV_DATABASE: &str = "GRIDREST_DATABASE";
pub const ENV_REGION: &str = "GRIDREST_REGION";

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `GridError::Config` if neither the environment nor any probed
/// file yields a usable configuration.
pub fn load() -> Result<ClientOptions> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    match load_from_env() {
        Ok(options) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(options)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `GridError::Config` if a required variable is missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<ClientOptions> {
    let url = env_var(ENV_URL)?;
    let username = env_var(ENV_USERNAME)?;
    let password = env_var(ENV_PASSWORD)?;

    let timeout = env_parse::<u64>(ENV_TIMEOUT_MS)?.map(Duration::from_millis);
    let attempts = env_parse::<u32>(ENV_RETRY_ATTEMPTS)?;
    let delay = env_parse::<u64>(ENV_RETRY_DELAY_MS)?.map(Duration::from_millis);

    let cluster = env_optional(ENV_CLUSTER);
    let database = env_optional(ENV_DATABASE);

    let options = match (cluster, database) {
        (Some(cluster), Some(database)) => {
            let mut config = CloudConfig::new(url, username, password, cluster, database);
            if let Some(region) = env_optional(ENV_REGION) {
                config = config.region(region);
            }
            if let Some(timeout) = timeout {
                config = config.timeout(timeout);
            }
            if let Some(attempts) = attempts {
                config = config.retry_attempts(attempts);
            }
            if let Some(delay) = delay {
                config = config.retry_delay(delay);
            }
            ClientOptions::Cloud(config)
        }
        (None, None) => {
            let mut config = ConnectionConfig::new(url, username, password);
            if let Some(timeout) = timeout {
                config = config.timeout(timeout);
            }
            if let Some(attempts) = attempts {
                config = config.retry_attempts(attempts);
            }
            if let Some(delay) = delay {
                config = config.retry_delay(delay);
            }
            ClientOptions::Standard(config)
        }
        _ => {
            return Err(GridError::Config(format!(
                "{ENV_CLUSTER} and {ENV_DATABASE} must be set together"
            )));
        }
    };

    Ok(options)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `GridError::Config` if the file is missing, unreadable, or not
/// valid JSON/TOML for [`ClientOptions`].
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientOptions> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(GridError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            GridError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| GridError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientOptions> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| GridError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| GridError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(GridError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the working directory, its parents and the executable directory
/// for `gridrest.{json,toml}` or `config.{json,toml}`.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["gridrest.toml", "gridrest.json", "config.toml", "config.json"];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join("..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|candidate| candidate.exists())
}

fn env_var(key: &str) -> Result<String> {
    env_optional(key)
        .ok_or_else(|| GridError::Config(format!("Missing required environment variable: {key}")))
}

/// Unset and blank are treated alike.
fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_optional(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| GridError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 9] = [
        ENV_URL,
        ENV_USERNAME,
        ENV_PASSWORD,
        ENV_TIMEOUT_MS,
        ENV_RETRY_ATTEMPTS,
        ENV_RETRY_DELAY_MS,
        ENV_CLUSTER,
        ENV_DATABASE,
        ENV_REGION,
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn test_load_standard_from_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_URL, "http://localhost:8080/griddb/v2/c/dbs/public");
        std::env::set_var(ENV_USERNAME, "admin");
        std::env::set_var(ENV_PASSWORD, "admin");
        std::env::set_var(ENV_RETRY_ATTEMPTS, "4");

        let options = load_from_env().expect("options");
        clear_env();

        match options {
            ClientOptions::Standard(config) => {
                assert_eq!(config.retry_attempts, 4);
                assert_eq!(config.timeout, Duration::from_secs(30));
                assert_eq!(config.retry_delay, Duration::from_secs(1));
            }
            other => panic!("expected standard options, got {other:?}"),
        }
    }

    #[test]
    fn test_cluster_and_database_select_cloud() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var(ENV_URL, "https://cloud.example.com/griddb/v2");
        std::env::set_var(ENV_USERNAME, "u");
        std::env::set_var(ENV_PASSWORD, "p");
        std::env::set_var(ENV_CLUSTER, "c1");
        std::env::set_var(ENV_DATABASE, "db1");
        std::env::set_var(ENV_REGION, "ap-1");
        std::env::set_var(ENV_TIMEOUT_MS, "1500");

        let options = load_from_env().expect("options");
        clear_env();

        match options {
            ClientOptions::Cloud(config) => {
                assert_eq!(config.cluster, "c1");
                assert_eq!(config.region.as_deref(), Some("ap-1"));
                assert_eq!(config.timeout, Duration::from_millis(1500));
                assert_eq!(config.retry_attempts, 5);
            }
            other => panic!("expected cloud options, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_invalid_env_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        assert!(matches!(load_from_env(), Err(GridError::Config(_))));

        std::env::set_var(ENV_URL, "http://localhost:8080");
        std::env::set_var(ENV_USERNAME, "admin");
        std::env::set_var(ENV_PASSWORD, "admin");
        std::env::set_var(ENV_TIMEOUT_MS, "soon");
        let invalid = load_from_env();

        std::env::set_var(ENV_TIMEOUT_MS, "100");
        std::env::set_var(ENV_CLUSTER, "only-cluster");
        let half_cloud = load_from_env();
        clear_env();

        assert!(matches!(invalid, Err(GridError::Config(ref m)) if m.contains(ENV_TIMEOUT_MS)));
        assert!(matches!(half_cloud, Err(GridError::Config(_))));
    }

    #[test]
    fn test_load_from_toml_file() {
        let file = write_temp(
            ".toml",
            r#"
kind = "cloud"
url = "https://cloud.example.com/griddb/v2"
username = "u"
password = "p"
cluster = "c1"
database = "db1"
retry_delay_ms = 250
"#,
        );

        let options = load_from_file(Some(file.path().to_path_buf())).expect("toml options");

        match options {
            ClientOptions::Cloud(config) => {
                assert_eq!(config.database, "db1");
                assert_eq!(config.retry_delay, Duration::from_millis(250));
                assert_eq!(config.timeout, Duration::from_secs(60));
            }
            other => panic!("expected cloud options, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_json_file() {
        let file = write_temp(
            ".json",
            r#"{"kind": "standard", "url": "http://localhost:8080", "username": "a", "password": "b", "timeout_ms": 500}"#,
        );

        let options = load_from_file(Some(file.path().to_path_buf())).expect("json options");

        assert_eq!(
            options,
            ClientOptions::Standard(
                ConnectionConfig::new("http://localhost:8080", "a", "b")
                    .timeout(Duration::from_millis(500))
            )
        );
    }

    #[test]
    fn test_file_errors() {
        let missing = load_from_file(Some(PathBuf::from("/definitely/not/here.toml")));
        assert!(matches!(missing, Err(GridError::Config(ref m)) if m.contains("not found")));

        let bad = write_temp(".json", "{ not json");
        assert!(matches!(
            load_from_file(Some(bad.path().to_path_buf())),
            Err(GridError::Config(ref m)) if m.contains("Invalid JSON")
        ));

        let yaml = write_temp(".yaml", "kind: standard");
        assert!(matches!(
            load_from_file(Some(yaml.path().to_path_buf())),
            Err(GridError::Config(ref m)) if m.contains("Unsupported")
        ));
    }
}
