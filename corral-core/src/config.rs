//! Configuration management.

use crate::error::{CorralError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persistent configuration for the CORRAL cluster directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite database, or ":memory:".
    pub db_path: String,
    /// Name under which this cluster member registers itself.
    pub node_name: String,
    /// Address advertised to other cluster members.
    pub node_address: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/corral/cluster.db".to_string(),
            node_name: "local".to_string(),
            node_address: String::new(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        std::env::var_os("CORRAL_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/corral"))
            .join("config.json")
    }

    /// Load configuration from disk.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| CorralError::InvalidConfig {
            reason: format!("Failed to read config: {}", e),
        })?;
        serde_json::from_str(&content).map_err(|e| CorralError::InvalidConfig {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CorralError::IoError { path: parent.to_path_buf(), source: e })?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| CorralError::InvalidConfig {
            reason: format!("Failed to serialize config: {}", e),
        })?;
        std::fs::write(&path, content).map_err(|e| CorralError::IoError { path, source: e })
    }
}
