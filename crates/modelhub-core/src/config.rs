//! Configuration management for modelhub
//!
//! Handles loading and saving the tool's own settings: where the editor
//! state is persisted and which task-runner project the deployment
//! documents belong to.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::{FileBlobStore, StoreOptions, DEFAULT_STORAGE_KEY};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Editor state persistence
    #[serde(default)]
    pub storage: StorageConfig,
    /// Deployment target
    #[serde(default)]
    pub project: ProjectConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

impl Config {
    /// Directory holding the persisted editor blob
    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .dir
            .clone()
            .unwrap_or_else(FileBlobStore::default_dir)
    }

    /// Store options derived from the storage section
    /// Tracing filter directive: debug output for the library when verbose,
    /// otherwise the configured `general.log_level`
    pub fn log_filter(&self, verbose: bool) -> String {
        if verbose {
            "info,modelhub_core=debug".to_string()
        } else {
            self.general.log_level.clone()
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            storage_key: self.storage.key.clone(),
            seed_defaults: self.storage.seed_defaults,
        }
    }
}

/// Editor state persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the blob files (defaults to the platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Blob key of the editor state
    pub key: String,
    /// Seed well-known providers into an empty store
    pub seed_defaults: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
            seed_defaults: true,
        }
    }
}

/// Task-runner project settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root containing `scripts/modules` and `.taskmaster`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("modelhub").join("config.toml"))
    }

    /// Load configuration from a file
    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Remember the task-runner project directory
    pub fn set_project_dir(&mut self, dir: Option<PathBuf>) {
        self.config.project.dir = dir;
    }

    /// Configured project directory, if any
    pub fn project_dir(&self) -> Option<&Path> {
        self.config.project.dir.as_deref()
    }
}
