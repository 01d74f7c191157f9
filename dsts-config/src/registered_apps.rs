use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// A registered application allowed to request app access tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredApp {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    pub public_key_file: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegisteredAppConfig {
    #[serde(default)]
    pub registered_apps: Vec<RegisteredApp>,
}

/// Load the registered-apps YAML document. A missing *key file* referenced
/// by an entry is not fatal (that entry is skipped by the caller at
/// upsert time); a malformed registered-apps YAML document itself fails
/// startup, per spec §6.4.
pub fn load_registered_apps(path: impl AsRef<Path>) -> Result<RegisteredAppConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: RegisteredAppConfig =
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    for app in &parsed.registered_apps {
        if !Path::new(&app.public_key_file).exists() {
            warn!(app_id = %app.id, file = %app.public_key_file, "registered app key file not found, skipping at upsert time");
        }
    }

    Ok(parsed)
}
