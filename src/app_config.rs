use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::DatabaseConnection;
use crate::storage::{ModelRegistry, registry::default_classes};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Database location
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Storage model bindings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Locales managed by the application
    #[serde(default = "default_managed_locales")]
    pub managed_locales: Vec<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Database configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file; the platform data directory is
    /// used when unset
    #[serde(default)]
    pub path: Option<String>,
}

impl DatabaseConfig {
    /// Resolve the database path, falling back to the default location
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
            _ => DatabaseConnection::default_database_path(),
        }
    }

    /// Open the configured database
    pub fn open(&self) -> Result<DatabaseConnection> {
        DatabaseConnection::new(self.resolve_path()?)
    }
}

/// Storage configuration: which model class backs each logical name
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Name of the persistence manager the storage is bound to
    #[serde(default = "default_manager_name")]
    pub manager_name: String,

    /// Logical name (`trans_unit`, `translation`, `file`) to model class
    #[serde(default = "default_classes")]
    pub classes: BTreeMap<String, String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            manager_name: default_manager_name(),
            classes: default_classes(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_manager_name() -> String {
    "default".to_string()
}

fn default_managed_locales() -> Vec<String> {
    vec!["en".to_string(), "fr".to_string()]
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.managed_locales.is_empty() {
            return Err(anyhow!("At least one managed locale is required"));
        }

        for locale in &self.managed_locales {
            crate::locale_utils::validate_locale(locale)
                .with_context(|| format!("Invalid managed locale: {}", locale))?;
        }

        if self.storage.manager_name.trim().is_empty() {
            return Err(anyhow!("Storage manager name cannot be empty"));
        }

        ModelRegistry::from_classes(&self.storage.classes)
            .context("Invalid storage model classes")?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Load the configuration, writing a default one if the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!(
            "Config file not found at '{}', creating default config.",
            path.display()
        );
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Whether `locale` is one of the managed locales
    pub fn manages_locale(&self, locale: &str) -> bool {
        self.managed_locales
            .iter()
            .any(|managed| crate::locale_utils::locales_match(managed, locale))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            managed_locales: default_managed_locales(),
            log_level: LogLevel::default(),
        }
    }
}
