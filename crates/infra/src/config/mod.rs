//! Configuration loading
//!
//! Produces [`ClientOptions`](gridrest_domain::ClientOptions) from the
//! environment, a `.env` file, or a JSON/TOML config file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
