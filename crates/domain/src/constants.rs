//! Protocol and configuration constants

use std::time::Duration;

// Connection defaults
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// Cloud connection defaults
pub const CLOUD_TIMEOUT: Duration = Duration::from_secs(60);
pub const CLOUD_RETRY_ATTEMPTS: u32 = 5;
pub const CLOUD_RETRY_DELAY: Duration = Duration::from_secs(2);

// Header names injected for cloud deployments
pub const HEADER_CLUSTER: &str = "cluster";
pub const HEADER_DATABASE: &str = "database";
pub const HEADER_REGION: &str = "region";

// Query descriptor types
pub const QUERY_TYPE_SQL_SELECT: &str = "sql-select";
pub const QUERY_TYPE_TQL: &str = "tql";
