use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rca_core::{MonitorConfig, SampleFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "RCA_DATA_DIR";

/// Default polling period of a followed log.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// How samples are obtained and read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub poll_interval_ms: u64,
    #[serde(flatten)]
    pub format: SampleFormat,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            format: SampleFormat::default(),
        }
    }
}

/// Contents of an `rca.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcaConfig {
    pub monitor: MonitorConfig,
    pub driver: DriverConfig,
}

pub fn load_config(path: &Path) -> Result<RcaConfig> {
    let text = fs::read_to_string(path)?;
    let config: RcaConfig = toml::from_str(&text)
        .map_err(|e| StoreError::InvalidData(format!("{}: {e}", path.display())))?;
    tracing::debug!(?config, "loaded configuration from {}", path.display());
    Ok(config)
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Data directory: explicit override, then `RCA_DATA_DIR`, then `~/.rca`.
pub fn data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join(".rca"),
    }
}
