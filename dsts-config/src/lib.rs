//! Configuration loading for the Device Security Token Service.
//!
//! A YAML file is the primary source; a small set of environment
//! variables can override individual fields afterward. This mirrors
//! `config.ConfigMgr` in the source system almost field-for-field — the
//! env var names below are deliberately the on-wire contract, not an
//! implementation detail, since operators already depend on them.

mod error;
mod registered_apps;

pub use error::{ConfigError, Result};
pub use registered_apps::{load_registered_apps, RegisteredApp, RegisteredAppConfig};

use serde::Deserialize;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub rpc_port: u16,
    pub rest_port: u16,
    pub registered_app_keys: String,
    #[serde(default)]
    pub log_rest_requests: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub cache_hostname: String,
    pub cache_port: u16,
    pub cache_db: i64,
    #[serde(skip)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    pub user: String,
    #[serde(skip)]
    pub password: String,
    pub schema: String,
    #[serde(default)]
    pub migrate_enabled: bool,
    #[serde(default)]
    pub debug_enabled: bool,
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: u32,
    pub ssl_mode: String,
    #[serde(default)]
    pub ssl_root_cert: String,
}

fn default_max_open_connections() -> u32 {
    5 * num_cpus_fallback()
}

fn num_cpus_fallback() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub config_file_path: String,

    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,

    #[serde(skip)]
    pub test_mode: bool,
}

const DEFAULT_CONFIG_FILE_PATH: &str = "config.yaml";

/// Load `Config` from YAML, honoring the `DSTS_CONFIG_LOCATION` env
/// override for the file path, then layering the individual
/// `DSTS_*`-prefixed overrides recognized by the source system.
pub fn load() -> Result<Config> {
    let path = env::var("DSTS_CONFIG_LOCATION").unwrap_or_else(|_| DEFAULT_CONFIG_FILE_PATH.to_string());
    load_from_path(&path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    config.config_file_path = path.display().to_string();
    apply_env_overrides(&mut config);
    config.test_mode = env::var("TEST_MODE").map(|v| v == "enabled").unwrap_or(false);
    Ok(config)
}

/// Environment overrides recognized by the source system. Secrets
/// (`DSTS_CACHE_PASSWORD`, `DSTS_DB_PASSWORD`) are never read from the
/// YAML file at all — they only ever come from the environment.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = env::var("DSTS_SERVER") {
        config.server.host = v;
    }
    if let Some(v) = parsed_env::<u16>("DSTS_RPC_PORT") {
        config.server.rpc_port = v;
    }
    if let Some(v) = parsed_env::<u16>("DSTS_REST_PORT") {
        config.server.rest_port = v;
    }
    if let Ok(v) = env::var("DSTS_REGISTERED_APP_CONFIG_FILE") {
        config.server.registered_app_keys = v;
    }
    if let Some(v) = parsed_env::<bool>("DSTS_REST_DEBUG_ENABLED") {
        config.server.log_rest_requests = v;
    }

    if let Some(v) = parsed_env::<bool>("DSTS_CACHE_ENABLED") {
        config.cache.enabled = v;
    }
    if let Ok(v) = env::var("DSTS_CACHE_HOST") {
        config.cache.cache_hostname = v;
    }
    if let Some(v) = parsed_env::<u16>("DSTS_CACHE_PORT") {
        config.cache.cache_port = v;
    }
    config.cache.password = env::var("DSTS_CACHE_PASSWORD").unwrap_or_default();

    if let Ok(v) = env::var("DSTS_DB_HOST") {
        config.database.db_hostname = v;
    }
    if let Some(v) = parsed_env::<u16>("DSTS_DB_PORT") {
        config.database.db_port = v;
    }
    if let Ok(v) = env::var("DSTS_DB_NAME") {
        config.database.db_name = v;
    }
    if let Ok(v) = env::var("DSTS_DB_USER") {
        config.database.user = v;
    }
    config.database.password = env::var("DSTS_DB_PASSWORD").unwrap_or_default();
    if let Ok(v) = env::var("DSTS_DB_SCHEMA_LOCATION") {
        config.database.schema = v;
    }
    if let Some(v) = parsed_env::<bool>("DSTS_DB_DEBUG_ENABLED") {
        config.database.debug_enabled = v;
    }
    if let Some(v) = parsed_env::<bool>("DSTS_DB_MIGRATE_ENABLED") {
        config.database.migrate_enabled = v;
    }
    if let Ok(v) = env::var("DSTS_DB_SSL_MODE") {
        config.database.ssl_mode = v;
    }
    if let Ok(v) = env::var("DSTS_DB_SSL_ROOT_CERT") {
        config.database.ssl_root_cert = v;
    }
}

fn parsed_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config_file() {
        let yaml = r#"
server:
  host: "0.0.0.0"
  rpc_port: 9443
  rest_port: 9090
  registered_app_keys: "registered_apps.yaml"
  log_rest_requests: false
logging:
  log_level: "info"
database:
  db_hostname: "localhost"
  db_port: 5432
  db_name: "dsts"
  user: "dsts"
  schema: "./schema"
  migrate_enabled: true
  debug_enabled: false
  ssl_mode: "disable"
cache:
  enabled: true
  cache_hostname: "localhost"
  cache_port: 6379
  cache_db: 0
"#;
        let dir = std::env::temp_dir().join(format!("dsts-config-test-{}", std::process::id()));
        std::fs::write(&dir, yaml).expect("write temp config");
        let config = load_from_path(&dir).expect("load config");
        std::fs::remove_file(&dir).ok();

        assert_eq!(config.server.rpc_port, 9443);
        assert_eq!(config.database.db_name, "dsts");
        assert!(config.cache.enabled);
    }
}
