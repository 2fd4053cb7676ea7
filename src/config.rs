//! Framework Configuration
//!
//! Loaded from a TOML file; every field has a default so an empty or missing
//! file yields a usable configuration.

use std::path::{Path, PathBuf};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameworkConfig {
    /// Resolve quest names without an owner prefix by bare name
    #[serde(default = "default_true")]
    pub bare_name_fallback: bool,
    /// Directory for per-player stats files
    #[serde(default = "default_stats_dir")]
    pub stats_dir: PathBuf,
    /// Content pack files to load, in order
    #[serde(default)]
    pub content: Vec<PathBuf>,
    /// `tracing` filter directive used by the binary
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_true() -> bool {
    true
}

fn default_stats_dir() -> PathBuf {
    PathBuf::from("stats")
}

fn default_log_filter() -> String {
    "quest_framework=info".to_string()
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            bare_name_fallback: default_true(),
            stats_dir: default_stats_dir(),
            content: Vec::new(),
            log_filter: default_log_filter(),
        }
    }
}

impl FrameworkConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist.
    /// Relative content and stats paths are resolved against the file's directory.
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            warn!("Config file {:?} does not exist, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: FrameworkConfig = toml::from_str(&content)?;

        if let Some(base) = path.parent() {
            config.stats_dir = base.join(&config.stats_dir);
            config.content = config.content.iter().map(|p| base.join(p)).collect();
        }

        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}
