//! Configuration loading and defaults.
//!
//! A single optional `config.toml`; every field has a default so the file
//! can be absent entirely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    /// Request interception settings.
    #[serde(default)]
    pub interceptor: InterceptorConfig,

    /// Persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Interception predicate and boundary timeout.
#[derive(Debug, Clone, Deserialize)]
pub struct InterceptorConfig {
    /// Substring matched against outgoing URLs; only matching calls are
    /// intercepted.
    #[serde(default = "default_target_url_pattern")]
    pub target_url_pattern: String,

    /// How long a suspended call waits for the boundary round-trip before
    /// failing open, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl InterceptorConfig {
    /// Boundary round-trip timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            target_url_pattern: default_target_url_pattern(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Storage settings for the CLI binary.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path. Defaults to the platform data directory.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }
}

// Default value functions for serde

fn default_target_url_pattern() -> String {
    "/conversation".to_owned()
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "mailveil")
        .map(|dirs| dirs.data_dir().join("history.db"))
        .unwrap_or_else(|| PathBuf::from("mailveil.db"))
}
