use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Per-environment outbound credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub segment_write_key: String,
}

/// Static mapping of environment name to write credential, loaded once at
/// startup and read-only for the lifetime of the process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn write_key(&self, env: &str) -> Option<&str> {
        self.environments
            .get(env)
            .map(|e| e.segment_write_key.as_str())
    }
}
