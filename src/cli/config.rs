//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./sqlcontainers.toml or ./.sqlcontainers/config.toml
//! 2. User config: ~/.sqlcontainers/config.toml
//! 3. Built-in defaults
//!
//! An explicit `--config` path skips discovery.

use crate::admin::AdminServiceConfig;
use crate::app::AppOptions;
use crate::engine::{IMAGE_CHOICES, SUPPORTED_IMAGES};
use crate::env;
use crate::executor::HostScripts;
use crate::session::PollConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Interactive session polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 10,
        }
    }
}

/// Retry of empty database listings while SQL Server starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabasesSection {
    pub retry_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for DatabasesSection {
    fn default() -> Self {
        Self {
            retry_interval_ms: 5000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub stop_timeout_secs: i64,
    pub pull_images: bool,
    /// Image repositories that count as SQL Server
    pub supported_images: Vec<String>,
    /// Images offered when creating a container
    pub image_choices: Vec<String>,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            stop_timeout_secs: 10,
            pull_images: true,
            supported_images: SUPPORTED_IMAGES.iter().map(|s| s.to_string()).collect(),
            image_choices: IMAGE_CHOICES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsSection {
    /// Directory holding the volume helper scripts
    pub dir: Option<PathBuf>,
    /// Longest a helper script may run
    pub timeout_secs: u64,
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            dir: None,
            timeout_secs: 120,
        }
    }
}

/// Complete configuration of the `sqlc` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub admin: AdminServiceConfig,
    pub session: SessionSection,
    pub databases: DatabasesSection,
    pub engine: EngineSection,
    pub scripts: ScriptsSection,
}

impl AppConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            scripts: HostScripts::current(),
            session_poll: PollConfig::from_millis(
                self.session.poll_interval_ms,
                self.session.max_attempts,
            ),
            database_retry: PollConfig::from_millis(
                self.databases.retry_interval_ms,
                self.databases.max_attempts,
            ),
        }
    }

    /// Configured scripts directory, else the one bundled with the binary.
    pub fn scripts_dir(&self) -> Option<PathBuf> {
        self.scripts.dir.clone().or_else(env::bundled_scripts_dir)
    }

    #[cfg(feature = "containers")]
    pub fn docker_config(&self) -> crate::engine::DockerEngineConfig {
        crate::engine::DockerEngineConfig {
            supported_images: self.engine.supported_images.clone(),
            pull_images: self.engine.pull_images,
            stop_timeout: self.engine.stop_timeout_secs,
        }
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load the override if given, otherwise discover.
    pub fn load(config_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                AppConfig::from_toml_file(path)
            }
            None => Self::discover_config(),
        }
    }

    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<AppConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return AppConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(AppConfig::default())
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std::env::current_dir() {
            candidates.push(env::local_flat_config_file_path(&current_dir));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = env::home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        candidates
    }

    /// Create a default config file in the user's home directory
    pub fn create_default_user_config() -> Result<PathBuf, ConfigError> {
        let home_dir = env::home_dir().ok_or(ConfigError::NoHomeDir)?;

        let config_dir = env::data_dir_path(&home_dir);
        let config_path = env::user_config_file_path(&home_dir);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(|source| ConfigError::Io {
                path: config_dir.clone(),
                source,
            })?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !config_path.exists() {
            AppConfig::default().to_toml_file(&config_path)?;
            info!("Created default configuration file: {:?}", config_path);
        } else {
            warn!("Configuration file already exists: {:?}", config_path);
        }

        Ok(config_path)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.is_file() {
                "✓ EXISTS"
            } else if candidate.exists() {
                "✗ NOT A FILE"
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
