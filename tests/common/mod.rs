/*!
 * Common test utilities for the translation-store test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use translation_store::app_config::StorageConfig;
use translation_store::database::{DatabaseConnection, Session, TransUnit};
use translation_store::storage::{DatabaseStorage, TranslationStorage};

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// In-memory database with a default storage adapter
pub fn setup_storage() -> Result<(DatabaseConnection, DatabaseStorage)> {
    init_logging();
    let db = DatabaseConnection::new_in_memory()?;
    let storage = DatabaseStorage::new(&StorageConfig::default())?;
    Ok((db, storage))
}

/// Persist and flush `count` units `key.NN` in `domain`, each translated in `locale`
pub fn seed_units(
    storage: &DatabaseStorage,
    session: &mut Session,
    count: usize,
    domain: &str,
    locale: &str,
) -> Result<Vec<TransUnit>> {
    let mut units = Vec::with_capacity(count);
    for i in 0..count {
        let mut unit = TransUnit::new(&format!("key.{:02}", i), domain);
        unit.set_translation(locale, &format!("content {}", i));
        storage.persist(session, unit.clone().into());
        units.push(unit);
    }
    storage.flush(session, None)?;
    Ok(units)
}
