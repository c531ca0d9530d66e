/*!
 * Integration tests for session scopes and on-disk persistence
 */

use anyhow::{Result, anyhow};
use std::sync::Arc;
use translation_store::app_config::StorageConfig;
use translation_store::database::{DatabaseConnection, TransUnit};
use translation_store::storage::{DatabaseStorage, TranslationStorage};

use crate::common;

/// Flushed units survive reopening the database file
#[test]
fn test_onDiskDatabase_shouldPersistAcrossConnections() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let db_path = temp_dir.path().join("translations.db");
    let storage = DatabaseStorage::new(&StorageConfig::default())?;

    let mut unit = TransUnit::new("menu.home", "messages");
    unit.set_translation("fr", "Accueil");

    {
        let db = DatabaseConnection::new(&db_path)?;
        let mut session = db.open_session();
        storage.persist(&mut session, unit.clone().into());
        storage.flush(&mut session, None)?;
    }

    let reopened = DatabaseConnection::new(&db_path)?;
    let session = reopened.open_session();
    let fetched = storage.get_trans_unit_by_id(&session, &unit.id)?;
    assert_eq!(fetched, Some(unit));

    let stats = reopened.stats()?;
    assert_eq!(stats.trans_unit_count, 1);
    assert_eq!(stats.translation_count, 1);

    Ok(())
}

/// Staged writes are invisible to other sessions until flushed
#[test]
fn test_stagedWrites_shouldStayPrivateToTheirSession() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut writer = db.open_session();
    let reader = db.open_session();

    let unit = TransUnit::new("title", "messages");
    storage.persist(&mut writer, unit.clone().into());

    assert!(storage.get_trans_unit_by_id(&writer, &unit.id)?.is_some());
    assert!(storage.get_trans_unit_by_id(&reader, &unit.id)?.is_none());

    storage.flush(&mut writer, None)?;
    assert!(storage.get_trans_unit_by_id(&reader, &unit.id)?.is_some());

    Ok(())
}

/// A staged removal hides the unit from its own session only
#[test]
fn test_stagedRemoval_shouldHideUnitUntilCleared() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();
    let units = common::seed_units(&storage, &mut session, 1, "messages", "fr")?;
    let unit = units[0].clone();

    storage.remove(&mut session, unit.clone().into());
    assert!(storage.get_trans_unit_by_id(&session, &unit.id)?.is_none());
    assert!(storage.get_trans_unit_by_id(&db.open_session(), &unit.id)?.is_some());

    assert_eq!(storage.clear(&mut session, Some("trans_unit"))?, 1);
    assert!(storage.get_trans_unit_by_id(&session, &unit.id)?.is_some());

    Ok(())
}

/// with_session flushes on success and discards on failure
#[test]
fn test_withSession_shouldFlushOnlyOnSuccess() -> Result<()> {
    let (db, storage) = common::setup_storage()?;

    let committed = TransUnit::new("committed", "messages");
    db.with_session(|session| -> Result<()> {
        storage.persist(session, committed.clone().into());
        Ok(())
    })?;

    let discarded = TransUnit::new("discarded", "messages");
    let outcome = db.with_session(|session| -> Result<()> {
        storage.persist(session, discarded.clone().into());
        Err(anyhow!("caller failure"))
    });
    assert!(outcome.is_err());

    let session = db.open_session();
    assert!(storage.get_trans_unit_by_id(&session, &committed.id)?.is_some());
    assert!(storage.get_trans_unit_by_id(&session, &discarded.id)?.is_none());

    Ok(())
}

/// The async helper runs the scope off the runtime and commits it
#[tokio::test]
async fn test_withSessionAsync_shouldCommitFromBlockingTask() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let storage = Arc::new(storage);

    let unit = TransUnit::new("async.key", "messages");
    let task_storage = Arc::clone(&storage);
    let task_unit = unit.clone();
    let pending = db
        .with_session_async(move |session| -> Result<usize> {
            task_storage.persist(session, task_unit.into());
            Ok(session.pending())
        })
        .await?;
    assert_eq!(pending, 1);

    let session = db.open_session();
    let fetched = storage.get_trans_unit_by_key_and_domain(&session, "async.key", "messages")?;
    assert_eq!(fetched.map(|u| u.id), Some(unit.id));

    Ok(())
}

/// Concurrent async scopes on one connection each commit their own work
#[test]
fn test_withSessionAsync_withConcurrentScopes_shouldCommitAll() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let storage = Arc::new(storage);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut handles = Vec::new();
        for i in 0..8 {
            let db = db.clone();
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                db.with_session_async(move |session| -> Result<()> {
                    storage.persist(session, TransUnit::new(&format!("key.{}", i), "messages").into());
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await??;
        }
        Ok::<(), anyhow::Error>(())
    })?;

    let count = tokio_test::block_on(async {
        db.with_session_async({
            let storage = Arc::clone(&storage);
            move |session| -> Result<i64> {
                Ok(storage.count_trans_units(session, None, &Default::default())?)
            }
        })
        .await
    });
    assert_eq!(count?, 8);

    Ok(())
}

/// A staged unit that breaks (key, domain) uniqueness leaves other reads working
#[test]
fn test_reads_withConflictingStagedUnit_shouldStillSucceed() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();
    common::seed_units(&storage, &mut session, 1, "messages", "fr")?;

    let duplicate = TransUnit::new("key.00", "messages");
    storage.persist(&mut session, duplicate.clone().into());

    assert_eq!(storage.get_trans_unit_domains(&session)?, vec!["messages"]);
    assert!(storage.get_file_by_hash(&session, "missing")?.is_none());
    let durable = storage
        .get_trans_unit_by_key_and_domain(&session, "key.00", "messages")?
        .ok_or_else(|| anyhow!("seeded unit should be visible"))?;
    assert_ne!(durable.id, duplicate.id);
    assert!(storage.get_trans_unit_by_id(&session, &duplicate.id)?.is_none());

    let flushed = storage.flush(&mut session, None);
    assert!(flushed.is_err_and(|e| e.is_persistence()));
    assert_eq!(session.pending(), 1);

    storage.clear(&mut session, None)?;
    Ok(())
}

/// A key replaced through the setter round-trips after truncation
#[test]
fn test_setKey_withLongKey_shouldRoundTrip() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();

    let mut unit = TransUnit::new("short", "messages");
    unit.set_key(&"k".repeat(300));
    unit.set_translation("fr", "Long");
    storage.persist(&mut session, unit.clone().into());
    storage.flush(&mut session, None)?;

    let fetched = storage.get_trans_unit_by_id(&db.open_session(), &unit.id)?;
    assert_eq!(fetched.as_ref().map(|u| u.key().chars().count()), Some(255));
    assert_eq!(fetched, Some(unit));

    Ok(())
}
