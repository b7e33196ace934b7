//! Project configuration.
//!
//! Read once at startup from `.groundtruth/config.json` under the root. Every
//! field has a default, so the file is optional and may be partial.

use crate::error::{AnalysisError, Result};
use crate::ignore::PathMatcher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding tool state under the project root.
pub const CONFIG_DIR: &str = ".groundtruth";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra ignore patterns on top of the defaults and `.gitignore`.
    pub ignore: Vec<String>,
    /// Minimum time between change-driven updates of one folder.
    pub debounce_ms: u64,
    /// How often deferred updates are drained. Must be positive.
    pub sweep_interval_ms: u64,
    /// How many history records to ask for per folder.
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            debounce_ms: 2000,
            sweep_interval_ms: 5000,
            history_limit: 10,
        }
    }
}

impl Config {
    /// Where the config lives for a given root.
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Loads the config for `root`, falling back to defaults if there is
    /// no config file.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|e| AnalysisError::io(&path, e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|source| AnalysisError::Config { path: path.clone(), source })?;

        config
            .validate()
            .map_err(|message| AnalysisError::InvalidConfig { path, message })?;
        Ok(config)
    }

    /// Rejects values the watch loop can't run with.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sweep_interval_ms == 0 {
            return Err("sweep_interval_ms must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Builds the frozen path matcher for `root` with this config's extra
    /// patterns.
    pub fn matcher(&self, root: &Path) -> PathMatcher {
        PathMatcher::for_root(root, &self.ignore)
    }
}
