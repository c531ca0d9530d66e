/*!
 * Integration tests for catalogue import and export
 */

use anyhow::Result;
use std::collections::BTreeMap;
use translation_store::database::File;
use translation_store::errors::TransferError;
use translation_store::storage::TranslationStorage;
use translation_store::transfer::{
    self, IMPORT_BATCH_SIZE, export_file, export_file_json, find_catalogues, import_catalogue,
    import_catalogue_file, select_files,
};
use translation_store::TransUnitFilters;

use crate::common;

const MESSAGES_FR: &str = r#"{
    "menu": {
        "home": "Accueil",
        "contact": "Contact"
    },
    "title": "Bienvenue"
}"#;

const MESSAGES_EN: &str = r#"{
    "menu": {
        "home": "Home",
        "contact": "Contact us"
    },
    "title": "Welcome"
}"#;

/// Importing a directory registers one file per catalogue and merges locales
#[test]
fn test_importDirectory_shouldMergeLocalesIntoUnits() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "messages.fr.json", MESSAGES_FR)?;
    common::create_test_file(temp_dir.path(), "nested/messages.en.json", MESSAGES_EN)?;
    common::create_test_file(temp_dir.path(), "README.md", "not a catalogue")?;
    common::create_test_file(temp_dir.path(), "broken.json", "{}")?;

    let catalogues = find_catalogues(temp_dir.path())?;
    assert_eq!(catalogues.len(), 2);

    let mut session = db.open_session();
    for path in &catalogues {
        import_catalogue_file(&storage, &mut session, path, false)?;
    }

    assert_eq!(storage.get_all_files(&session)?.len(), 2);
    assert_eq!(
        storage.count_trans_units(&session, None, &TransUnitFilters::default())?,
        3
    );

    let home = storage
        .get_trans_unit_by_key_and_domain(&session, "menu.home", "messages")?
        .expect("menu.home should be imported");
    assert_eq!(home.locales(), vec!["en", "fr"]);
    assert_eq!(home.content("en"), Some("Home"));

    let fr_files = storage.get_files_by_locales_and_domains(&session, &["fr"], &["messages"])?;
    assert_eq!(fr_files.len(), 1);
    assert!(fr_files[0].path.ends_with("messages.fr.json"));

    Ok(())
}

/// Identical content imported twice yields a single file record
#[test]
fn test_importCatalogue_twice_shouldKeepOneFile() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.fr.json", MESSAGES_FR)?;

    let mut session = db.open_session();
    let first = import_catalogue_file(&storage, &mut session, &path, false)?;
    let second = import_catalogue_file(&storage, &mut session, &path, false)?;

    assert!(!first.file_reused);
    assert_eq!(first.created, 3);
    assert!(second.file_reused);
    assert_eq!(second.unchanged, 3);
    assert_eq!(second.created + second.updated, 0);

    let by_hash = storage
        .get_file_by_hash(&session, &File::hash_content(MESSAGES_FR.as_bytes()))?
        .expect("file should be registered");
    assert_eq!(by_hash.id, first.file.id);
    assert_eq!(storage.get_all_files(&session)?.len(), 1);

    Ok(())
}

/// Same content under another domain extends the existing file record
#[test]
fn test_importCatalogue_withSameContentInOtherDomain_shouldAddDomain() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();

    let content = br#"{"required": "Obligatoire"}"#;
    let first = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("validators.fr.json"),
        content,
        false,
    )?;
    let second = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("forms.fr.json"),
        content,
        false,
    )?;

    assert_eq!(first.file.id, second.file.id);
    let file = storage
        .get_file_by_id(&session, &first.file.id)?
        .expect("file should exist");
    assert!(file.covers_domain("validators"));
    assert!(file.covers_domain("forms"));

    Ok(())
}

/// Imports larger than one batch are flushed completely
#[test]
fn test_importCatalogue_withMoreThanOneBatch_shouldImportEverything() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();

    let entries: BTreeMap<String, String> = (0..IMPORT_BATCH_SIZE * 2 + 7)
        .map(|i| (format!("key.{:03}", i), format!("Valeur {}", i)))
        .collect();
    let content = serde_json::to_vec(&entries)?;

    let report = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("messages.fr.json"),
        &content,
        false,
    )?;

    assert_eq!(report.created, entries.len());
    assert!(!session.is_dirty());
    assert_eq!(
        storage.count_trans_units(
            &db.open_session(),
            Some(&["fr"][..]),
            &TransUnitFilters::default()
        )?,
        entries.len() as i64
    );

    Ok(())
}

/// Export returns all imported translations, or only those edited since
#[test]
fn test_exportFile_withOnlyUpdated_shouldReturnEditedTranslations() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.fr.json", MESSAGES_FR)?;

    let mut session = db.open_session();
    let report = import_catalogue_file(&storage, &mut session, &path, false)?;

    let exported = export_file(&storage, &session, &report.file, false)?;
    assert_eq!(exported.len(), 3);
    assert_eq!(exported["menu.home"], "Accueil");
    assert!(export_file(&storage, &session, &report.file, true)?.is_empty());

    let mut title = storage
        .get_trans_unit_by_key_and_domain(&session, "title", "messages")?
        .expect("title should be imported");
    title.set_translation("fr", "Bienvenue !");
    storage.persist(&mut session, title.into());
    storage.flush(&mut session, None)?;

    let updated = export_file(&storage, &session, &report.file, true)?;
    assert_eq!(updated.len(), 1);
    assert_eq!(updated["title"], "Bienvenue !");

    let json = export_file_json(&storage, &session, &report.file.hash, true)?;
    let parsed: BTreeMap<String, String> = serde_json::from_str(&json)?;
    assert_eq!(parsed, updated);

    Ok(())
}

/// Invalid catalogues are rejected before anything is staged
#[test]
fn test_importCatalogue_withInvalidInput_shouldFailWithoutStaging() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();

    let bad_name = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("messages.json"),
        b"{}",
        false,
    );
    assert!(matches!(bad_name, Err(TransferError::InvalidCatalogueName(_))));

    let bad_json = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("messages.fr.json"),
        b"{ nope",
        false,
    );
    assert!(matches!(bad_json, Err(TransferError::Json(_))));

    let bad_shape = import_catalogue(
        &storage,
        &mut session,
        std::path::Path::new("messages.fr.json"),
        br#"{"list": ["a", "b"]}"#,
        false,
    );
    assert!(matches!(bad_shape, Err(TransferError::InvalidCatalogue(_))));

    assert!(!session.is_dirty());
    assert!(storage.get_all_files(&session)?.is_empty());

    let missing = transfer::import_catalogue_file(
        &storage,
        &mut session,
        std::path::Path::new("/nonexistent/messages.fr.json"),
        false,
    );
    assert!(matches!(missing, Err(TransferError::Io(_))));

    Ok(())
}

/// Changed content at a known path registers a new file and reports the old one
#[test]
fn test_importCatalogue_withChangedContentAtSamePath_shouldReportStaleFile() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "messages.fr.json", MESSAGES_FR)?;

    let mut session = db.open_session();
    let first = import_catalogue_file(&storage, &mut session, &path, false)?;
    assert!(first.stale_files.is_empty());

    std::fs::write(&path, r#"{"title": "Bienvenue à tous"}"#)?;
    let second = import_catalogue_file(&storage, &mut session, &path, false)?;

    assert!(!second.file_reused);
    assert_ne!(second.file.id, first.file.id);
    assert_eq!(second.stale_files, vec![first.file.id.clone()]);
    assert_eq!(storage.get_all_files(&session)?.len(), 2);

    Ok(())
}

/// A locale or domain alone narrows the file listing instead of emptying it
#[test]
fn test_selectFiles_withOneDimension_shouldFilterAllFiles() -> Result<()> {
    let (db, storage) = common::setup_storage()?;
    let mut session = db.open_session();

    for (path, content) in [
        ("messages.fr.json", MESSAGES_FR),
        ("messages.en.json", MESSAGES_EN),
        ("validators.fr.json", r#"{"required": "Obligatoire"}"#),
    ] {
        import_catalogue(
            &storage,
            &mut session,
            std::path::Path::new(path),
            content.as_bytes(),
            false,
        )?;
    }

    let paths = |files: Vec<File>| files.into_iter().map(|f| f.path).collect::<Vec<_>>();

    assert_eq!(select_files(&storage, &session, &[], &[])?.len(), 3);
    assert_eq!(
        paths(select_files(&storage, &session, &["fr"], &[])?),
        vec!["messages.fr.json", "validators.fr.json"]
    );
    assert_eq!(
        paths(select_files(&storage, &session, &[], &["messages"])?),
        vec!["messages.en.json", "messages.fr.json"]
    );
    assert_eq!(
        paths(select_files(&storage, &session, &["en"], &["validators"])?),
        Vec::<String>::new()
    );

    Ok(())
}
