//! CLI configuration
//!
//! Stored as TOML at `<config dir>/kinfolk/config.toml`, or wherever
//! `KINFOLK_CONFIG` points.

use std::path::PathBuf;

use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "KINFOLK_CONFIG";

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kinfolk")
}

pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kinfolk")
        .join("config.toml")
}

/// Which storage engine holds the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Redb,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::Sqlite => "sqlite",
        }
    }

    /// Database file name inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Redb => "kinfolk.redb",
            Self::Sqlite => "kinfolk.db",
        }
    }
}

fn default_max_depth() -> u32 {
    kinfolk_core::limits::DEFAULT_TRAVERSAL_DEPTH
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    kinfolk_storage::backup::DEFAULT_INTERVAL.as_secs()
}

fn default_max_backups() -> usize {
    kinfolk_storage::backup::DEFAULT_MAX_BACKUPS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Take automatic backups after mutating commands
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum seconds between automatic backups
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            max_backups: default_max_backups(),
        }
    }
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub backend: BackendKind,

    /// Depth used by ancestor and descendant queries when none is given
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    #[serde(default)]
    pub backup: BackupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend: BackendKind::default(),
            default_max_depth: default_max_depth(),
            backup: BackupConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file, or defaults when there is none
    pub fn load() -> anyhow::Result<Self> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Data directory from the config, or the platform default
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "data_dir",
            "backend",
            "default_max_depth",
            "backup.enabled",
            "backup.interval_secs",
            "backup.max_backups",
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => Some(self.data_dir().display().to_string()),
            "backend" => Some(self.backend.as_str().to_string()),
            "default_max_depth" => Some(self.default_max_depth.to_string()),
            "backup.enabled" => Some(self.backup.enabled.to_string()),
            "backup.interval_secs" => Some(self.backup.interval_secs.to_string()),
            "backup.max_backups" => Some(self.backup.max_backups.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "backend" => {
                self.backend = BackendKind::from_str(value, true)
                    .map_err(|_| anyhow::anyhow!("backend must be redb or sqlite"))?
            }
            "default_max_depth" => {
                let depth: u32 = value.parse().context("default_max_depth must be a number")?;
                kinfolk_core::limits::validate_traversal_depth(depth)?;
                self.default_max_depth = depth;
            }
            "backup.enabled" => {
                self.backup.enabled = value.parse().context("backup.enabled must be true or false")?
            }
            "backup.interval_secs" => {
                self.backup.interval_secs =
                    value.parse().context("backup.interval_secs must be a number")?
            }
            "backup.max_backups" => {
                self.backup.max_backups =
                    value.parse().context("backup.max_backups must be a number")?
            }
            other => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                other,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    /// Put `key` back to its default value
    pub fn reset(&mut self, key: &str) -> anyhow::Result<()> {
        let defaults = Self::default();
        match key {
            "data_dir" => self.data_dir = defaults.data_dir,
            "backend" => self.backend = defaults.backend,
            "default_max_depth" => self.default_max_depth = defaults.default_max_depth,
            "backup.enabled" => self.backup.enabled = defaults.backup.enabled,
            "backup.interval_secs" => self.backup.interval_secs = defaults.backup.interval_secs,
            "backup.max_backups" => self.backup.max_backups = defaults.backup.max_backups,
            other => anyhow::bail!(
                "Unknown config key: {}. Available keys: {}",
                other,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    /// Database file for the configured backend
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(self.backend.file_name())
    }
}
