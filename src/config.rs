//! Process configuration.
//!
//! Thin layer over `~/.hostvault/config.toml`: where the inventory data
//! lives, where the master key comes from, and how logging behaves. A
//! missing file yields the defaults; a malformed file is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{KeyError, MasterKey};
use crate::logging::LogConfig;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid TOML.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the inventory collection files.
    pub data_dir: PathBuf,
    /// Optional path to a base64-encoded master key file. When unset, the
    /// key is read from the `HOSTVAULT_MASTER_KEY` environment variable.
    pub key_file: Option<PathBuf>,
    /// Logging settings.
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: config_directory().join("data"),
            key_file: None,
            log: LogConfig::default(),
        }
    }
}

/// Returns the configuration directory (`~/.hostvault`).
#[must_use]
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hostvault")
}

impl Config {
    /// Returns the default config file path (`~/.hostvault/config.toml`).
    #[must_use]
    pub fn default_path() -> PathBuf {
        config_directory().join("config.toml")
    }

    /// Loads the configuration from the default path.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads the configuration from a specific path.
    ///
    /// A missing file is not an error: defaults apply.
    ///
    /// # Errors
    /// Returns error if an existing file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Loads the master key from the configured source.
    ///
    /// Key file when configured, environment variable otherwise. The key
    /// is loaded once at process start and handed to the cipher; nothing
    /// else ever reads it.
    ///
    /// # Errors
    /// Returns `KeyError` if the source is missing or holds an invalid
    /// key.
    pub fn master_key(&self) -> Result<MasterKey, KeyError> {
        match self.key_file {
            Some(ref path) => MasterKey::load(path),
            None => MasterKey::from_env(),
        }
    }
}
