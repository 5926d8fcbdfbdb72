//! Engine configuration loaded from a TOML file.
//!
//! Every field has a default, so a missing file or a partial file is
//! valid. `WAYMARK_STORAGE_DIR` takes precedence over `storage_dir`.

use crate::checkpoint::{FileStore, StoreError};
use crate::recovery::ResumePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`EngineConfig::storage_dir`].
pub const STORAGE_DIR_ENV: &str = "WAYMARK_STORAGE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between timer-driven saves.
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Directory used by [`FileStore`].
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default)]
    pub resume: ResumeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeConfig {
    #[serde(default = "default_min_step")]
    pub min_step: u32,

    /// Per machine kind minimum step, e.g. `wizard = 2`.
    #[serde(default)]
    pub overrides: BTreeMap<String, u32>,
}

fn default_autosave_interval_secs() -> u64 {
    30
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".waymark")
}

fn default_min_step() -> u32 {
    crate::recovery::DEFAULT_MIN_STEP
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            min_step: default_min_step(),
            overrides: BTreeMap::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: default_autosave_interval_secs(),
            storage_dir: default_storage_dir(),
            resume: ResumeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, using defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(dir) = std::env::var(STORAGE_DIR_ENV) {
            if !dir.is_empty() {
                config.storage_dir = PathBuf::from(dir);
            }
        }

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Autosave period. Zero is raised to one second.
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs.max(1))
    }

    /// Resume policy for machine kind `kind`.
    pub fn resume_policy(&self, kind: &str) -> ResumePolicy {
        let min_step = self
            .resume
            .overrides
            .get(kind)
            .copied()
            .unwrap_or(self.resume.min_step);
        ResumePolicy::new(min_step)
    }

    /// Open a [`FileStore`] in the configured directory.
    pub fn open_store(&self) -> Result<FileStore, StoreError> {
        FileStore::open(&self.storage_dir)
    }
}
