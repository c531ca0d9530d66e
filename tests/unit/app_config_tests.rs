/*!
 * Tests for application configuration functionality
 */

use anyhow::Result;
use translation_store::app_config::{Config, LogLevel};
use translation_store::storage::DatabaseStorage;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.managed_locales, vec!["en", "fr"]);
    assert_eq!(config.storage.manager_name, "default");
    assert_eq!(config.storage.classes["trans_unit"], "TransUnit");
    assert_eq!(config.storage.classes["translation"], "Translation");
    assert_eq!(config.storage.classes["file"], "File");
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.database.path.is_none());
}

/// A missing config file is created with defaults
#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = temp_dir.path().join("trstore.json");

    let config = Config::load_or_create(&config_path)?;
    assert!(config_path.exists());

    let reloaded = Config::from_file(&config_path)?;
    assert_eq!(reloaded.managed_locales, config.managed_locales);
    assert_eq!(reloaded.storage.classes, config.storage.classes);

    Ok(())
}

/// An existing config file is read, not overwritten
#[test]
fn test_loadOrCreate_withExistingFile_shouldKeepValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(
        temp_dir.path(),
        "trstore.json",
        r#"{
            "database": {"path": "/tmp/custom.db"},
            "storage": {"manager_name": "catalogues"},
            "managed_locales": ["de", "pt-BR"],
            "log_level": "warn"
        }"#,
    )?;

    let config = Config::load_or_create(&config_path)?;

    assert_eq!(config.database.path.as_deref(), Some("/tmp/custom.db"));
    assert_eq!(config.storage.manager_name, "catalogues");
    assert_eq!(config.storage.classes.len(), 3);
    assert_eq!(config.log_level, LogLevel::Warn);
    assert!(config.validate().is_ok());
    assert!(config.manages_locale("pt_BR"));

    Ok(())
}

/// A malformed config file is reported, not replaced
#[test]
fn test_fromFile_withInvalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config_path = common::create_test_file(temp_dir.path(), "trstore.json", "{ not json")?;

    assert!(Config::load_or_create(&config_path).is_err());
    Ok(())
}

/// The configured database path is honoured
#[test]
fn test_databaseConfig_open_shouldCreateFileAtConfiguredPath() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("nested").join("store.db");

    let mut config = Config::default();
    config.database.path = Some(db_path.to_string_lossy().into_owned());

    let db = config.database.open()?;
    assert_eq!(db.path(), db_path.as_path());
    assert!(db_path.exists());

    Ok(())
}

/// Storage construction surfaces registry problems
#[test]
fn test_storageConfig_withUnknownClassName_shouldRejectStorage() {
    let mut config = Config::default();
    config
        .storage
        .classes
        .insert("glossary".to_string(), "Glossary".to_string());

    assert!(config.validate().is_err());
    assert!(DatabaseStorage::new(&config.storage).is_err());
}
