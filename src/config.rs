// ⚙️ Configuration - where the exports live and how the binaries start
//
// Optional JSON file (path in RECOVERY_CONFIG), then environment overrides.

use crate::source::Source;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "RECOVERY_CONFIG";
pub const DATA_DIR_ENV: &str = "RECOVERY_DATA_DIR";
pub const BIND_ADDR_ENV: &str = "RECOVERY_BIND_ADDR";
pub const SOURCE_ENV: &str = "RECOVERY_SOURCE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding captira-dataa.csv, simply-data.csv, joint-data.csv
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Listen address for recovery-server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Source selected at startup
    #[serde(default)]
    pub default_source: Source,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: default_data_dir(),
            bind_addr: default_bind_addr(),
            default_source: Source::default(),
        }
    }
}

impl AppConfig {
    /// Load config from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// File named by RECOVERY_CONFIG (if any), then env overrides
    pub fn load() -> Result<Self> {
        let base = match env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => AppConfig::from_file(path.trim())?,
            _ => AppConfig::default(),
        };

        base.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(addr) = lookup(BIND_ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }

        if let Some(source) = lookup(SOURCE_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_source = source
                .parse::<Source>()
                .with_context(|| format!("Invalid {}", SOURCE_ENV))?;
        }

        Ok(self)
    }
}
