use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow, bail};
use reqwest::Url;

use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

/// Request timeout when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable naming the solver endpoint.
pub const ENDPOINT_ENV: &str = "EASY_LEET_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_upload_bytes: Option<u64>,
}

/// Fully resolved settings the client runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: Url,
    pub timeout: Duration,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", config_path, e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Layer `overrides` on top of this config; any field set there wins.
    pub fn merged(&self, overrides: &Config) -> Config {
        Config {
            endpoint: overrides.endpoint.clone().or_else(|| self.endpoint.clone()),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            max_upload_bytes: overrides.max_upload_bytes.or(self.max_upload_bytes),
        }
    }

    /// Validate and fill in defaults. There is no default endpoint.
    pub fn settings(&self) -> Result<Settings> {
        let raw = self.endpoint.as_deref().ok_or_else(|| {
            anyhow!(
                "No solver endpoint configured. Pass --endpoint or set {}",
                ENDPOINT_ENV
            )
        })?;
        let endpoint = Url::parse(raw.trim())
            .map_err(|e| anyhow!("Invalid endpoint URL {:?}: {}", raw, e))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("Endpoint must be an http or https URL, got {:?}", raw);
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            bail!("Timeout must be at least one second");
        }

        Ok(Settings {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes: self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        })
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("easy-leet").join("config.json"))
    }
}
