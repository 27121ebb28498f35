//! Adapter configuration
//!
//! Controls scan permissions, scan-result caching, the backoff schedule,
//! and batch retry limits. Loadable from a JSON file; every field has a
//! default so partial files work.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backoff::BackoffConfig;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    /// The configuration content is not valid JSON for this shape
    #[error("Invalid config JSON: {0}")]
    Malformed(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_batch_retry_ceiling() -> u32 {
    5
}

/// Adapter-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Allow full-table scan fallback on every table
    pub scan_all: bool,

    /// Tables allowed to fall back to a scan when `scan_all` is off
    pub scannable_tables: Vec<String>,

    /// Tables whose full scan results are cached until invalidated
    pub cached_tables: Vec<String>,

    /// Wait schedule for throttle retries and schema-change polling
    pub backoff: BackoffConfig,

    /// Rounds of unprocessed-key resubmission before a batch read fails
    #[serde(default = "default_batch_retry_ceiling")]
    pub batch_retry_ceiling: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan_all: false,
            scannable_tables: Vec::new(),
            cached_tables: Vec::new(),
            backoff: BackoffConfig::default(),
            batch_retry_ceiling: default_batch_retry_ceiling(),
        }
    }
}

impl Config {
    /// Loads configuration from a JSON file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Whether `table` may fall back to a full scan
    pub fn is_scannable(&self, table: &str) -> bool {
        self.scan_all || self.scannable_tables.iter().any(|t| t == table)
    }

    /// Whether full scans of `table` are served from the scan cache
    pub fn is_cached(&self, table: &str) -> bool {
        self.cached_tables.iter().any(|t| t == table)
    }
}
