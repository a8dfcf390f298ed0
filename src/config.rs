//! Search configuration loaded from a JSON file
//!
//! Every field has a default so a partial (or missing) file is valid.

use crate::error::Result;
use crate::search::manager::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_RESULTS_PER_KEYWORD, DEFAULT_RELOAD_WINDOW_SIZE,
    DEFAULT_UPDATE_FREQUENCY, DEFAULT_WINDOW_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tuning values for a search coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum result tuples aggregated from one keyword query
    pub max_results_per_keyword: usize,
    /// Push an intermediate batch every this many processed tuples
    pub update_frequency: usize,
    /// Rows per UI push
    pub batch_size: usize,
    /// Default window for `next_page`
    pub window_size: usize,
    /// Window used when reloading from index 0 after a sort change
    pub reload_window_size: usize,
    /// Optional deadline for a single keyword query. `None` waits forever.
    pub query_timeout_ms: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results_per_keyword: DEFAULT_MAX_RESULTS_PER_KEYWORD,
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            reload_window_size: DEFAULT_RELOAD_WINDOW_SIZE,
            query_timeout_ms: None,
        }
    }
}

impl SearchConfig {
    /// Default location: `<config_dir>/deepfind/config.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("deepfind").join("config.json"))
    }

    /// Read and sanitise a config file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        log::debug!("Loaded search config from {}", path.display());
        Ok(config.sanitized())
    }

    /// Like [`SearchConfig::load`], but a missing file yields the defaults
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Clamp values that must be at least one
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.window_size = self.window_size.max(1);
        self.reload_window_size = self.reload_window_size.max(1);
        self.update_frequency = self.update_frequency.max(1);
        self
    }

    #[must_use]
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}
