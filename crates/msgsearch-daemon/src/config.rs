//! Configuration loading and defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::search::SnippetStyle;

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Daemon-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Database location. Defaults to the XDG data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// IPC socket location. Defaults to the XDG runtime directory.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

/// Search-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub snippet: SnippetStyle,
}

impl Config {
    /// Load configuration from file, or return defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = msgsearch_common::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.warn_on_clamped_values();
        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.daemon
            .database_path
            .clone()
            .unwrap_or_else(msgsearch_common::database_path)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.daemon
            .socket_path
            .clone()
            .unwrap_or_else(msgsearch_common::socket_path)
    }

    fn warn_on_clamped_values(&self) {
        let tokens = self.search.snippet.tokens;
        if !(1..=64).contains(&tokens) {
            warn!(
                "search.snippet.tokens = {} is outside 1..=64 and will be clamped",
                tokens
            );
        }
    }
}
