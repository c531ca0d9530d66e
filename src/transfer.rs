/*!
 * Catalogue import and export on top of the storage contract.
 *
 * Catalogues are JSON files named `<domain>.<locale>.json`. Nested objects
 * are flattened with `.` separators. Imports are keyed by the content hash
 * of the catalogue, so importing identical content again reuses the same
 * file record.
 */

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::database::{File, Session, TransUnit};
use crate::errors::TransferError;
use crate::locale_utils::normalize_locale;
use crate::storage::TranslationStorage;

/// Extension of importable catalogues
pub const CATALOGUE_EXTENSION: &str = "json";

/// Number of persisted units after which an import flushes
pub const IMPORT_BATCH_SIZE: usize = 50;

/// Domain, locale and extension encoded in a catalogue file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueName {
    pub domain: String,
    pub locale: String,
    pub extension: String,
}

impl CatalogueName {
    /// Parse `<domain>.<locale>.<extension>`; the domain may itself contain dots
    pub fn parse(path: &Path) -> Result<Self, TransferError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| TransferError::InvalidCatalogueName(path.display().to_string()))?;

        let mut parts = file_name.rsplitn(3, '.');
        let (Some(extension), Some(locale), Some(domain)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TransferError::InvalidCatalogueName(file_name.to_string()));
        };

        if domain.is_empty() || extension.is_empty() {
            return Err(TransferError::InvalidCatalogueName(file_name.to_string()));
        }

        let locale = normalize_locale(locale)
            .map_err(|e| TransferError::InvalidCatalogueName(format!("{}: {}", file_name, e)))?;

        Ok(Self {
            domain: domain.to_string(),
            locale,
            extension: extension.to_lowercase(),
        })
    }
}

/// Flatten a JSON catalogue into `key -> content` pairs
pub fn flatten_catalogue(value: &Value) -> Result<BTreeMap<String, String>, TransferError> {
    let Value::Object(_) = value else {
        return Err(TransferError::InvalidCatalogue(
            "catalogue root must be an object".to_string(),
        ));
    };

    let mut entries = BTreeMap::new();
    flatten_into(&mut entries, "", value)?;
    Ok(entries)
}

fn flatten_into(
    entries: &mut BTreeMap<String, String>,
    prefix: &str,
    value: &Value,
) -> Result<(), TransferError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(entries, &path, child)?;
            }
        }
        Value::String(content) => {
            entries.insert(prefix.to_string(), content.clone());
        }
        Value::Number(number) => {
            entries.insert(prefix.to_string(), number.to_string());
        }
        Value::Bool(flag) => {
            entries.insert(prefix.to_string(), flag.to_string());
        }
        Value::Null => {}
        Value::Array(_) => {
            return Err(TransferError::InvalidCatalogue(format!(
                "arrays are not supported (at \"{}\")",
                prefix
            )));
        }
    }
    Ok(())
}

/// Outcome of one catalogue import
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// File record the translations are linked to
    pub file: File,
    /// Whether identical content had already been imported
    pub file_reused: bool,
    /// Ids of earlier files imported from the same path
    pub stale_files: Vec<String>,
    /// Translations added
    pub created: usize,
    /// Translations whose content or source file changed
    pub updated: usize,
    /// Translations already up to date
    pub unchanged: usize,
    /// Manually edited translations left untouched
    pub skipped: usize,
}

/// Import a catalogue's content into storage.
///
/// Manually edited translations are kept unless `force` is set. Changes are
/// flushed every `IMPORT_BATCH_SIZE` units and once at the end.
///
/// Files are identified by content hash, so importing changed content from
/// a path registers a new File. Earlier Files with the same path are kept
/// along with their translations and listed in `ImportReport::stale_files`.
pub fn import_catalogue(
    storage: &dyn TranslationStorage,
    session: &mut Session,
    path: &Path,
    content: &[u8],
    force: bool,
) -> Result<ImportReport, TransferError> {
    let name = CatalogueName::parse(path)?;
    let value: Value = serde_json::from_slice(content)?;
    let entries = flatten_catalogue(&value)?;

    let hash = File::hash_content(content);
    let mut stale_files = Vec::new();
    let (file, file_reused) = match storage.get_file_by_hash(session, &hash)? {
        Some(mut file) => {
            if file.locale != name.locale {
                warn!(
                    "Content of {} was already imported as locale '{}'",
                    path.display(),
                    file.locale
                );
            }
            if file.domains.insert(name.domain.clone()) {
                storage.persist(session, file.clone().into());
            }
            (file, true)
        }
        None => {
            let path_str = path.to_string_lossy();
            stale_files = storage
                .get_all_files(session)?
                .into_iter()
                .filter(|other| other.path == path_str)
                .map(|other| other.id)
                .collect();
            if !stale_files.is_empty() {
                warn!(
                    "{} changed since its last import; {} older file record(s) remain",
                    path.display(),
                    stale_files.len()
                );
            }

            let file = File::new(
                &path.to_string_lossy(),
                &name.locale,
                [name.domain.as_str()],
                content,
            );
            storage.persist(session, file.clone().into());
            (file, false)
        }
    };

    let mut report = ImportReport {
        file,
        file_reused,
        stale_files,
        created: 0,
        updated: 0,
        unchanged: 0,
        skipped: 0,
    };

    let mut pending = 0;
    for (key, content) in &entries {
        let mut unit = storage
            .get_trans_unit_by_key_and_domain(session, key, &name.domain)?
            .unwrap_or_else(|| TransUnit::new(key, &name.domain));

        match unit.translation(&name.locale) {
            Some(existing)
                if existing.content == *content
                    && existing.file_id.as_deref() == Some(report.file.id.as_str()) =>
            {
                report.unchanged += 1;
                continue;
            }
            Some(existing) if existing.modified_manually && !force => {
                debug!("Keeping manually edited translation for '{}'", key);
                report.skipped += 1;
                continue;
            }
            Some(_) => report.updated += 1,
            None => report.created += 1,
        }

        unit.set_imported_translation(&name.locale, content, &report.file.id);
        storage.persist(session, unit.into());

        pending += 1;
        if pending >= IMPORT_BATCH_SIZE {
            storage.flush(session, None)?;
            pending = 0;
        }
    }

    storage.flush(session, None)?;

    info!(
        "Imported {}: {} created, {} updated, {} unchanged, {} skipped",
        path.display(),
        report.created,
        report.updated,
        report.unchanged,
        report.skipped
    );

    Ok(report)
}

/// Read a catalogue from disk and import it
pub fn import_catalogue_file(
    storage: &dyn TranslationStorage,
    session: &mut Session,
    path: &Path,
    force: bool,
) -> Result<ImportReport, TransferError> {
    let content = std::fs::read(path)?;
    import_catalogue(storage, session, path, &content, force)
}

/// List files matching the given locales and domains.
///
/// An empty set does not restrict that dimension, so locales alone or
/// domains alone filter every file. With both sets given this is
/// `get_files_by_locales_and_domains`.
pub fn select_files(
    storage: &dyn TranslationStorage,
    session: &Session,
    locales: &[&str],
    domains: &[&str],
) -> Result<Vec<File>, TransferError> {
    if !locales.is_empty() && !domains.is_empty() {
        return Ok(storage.get_files_by_locales_and_domains(session, locales, domains)?);
    }

    let files = storage
        .get_all_files(session)?
        .into_iter()
        .filter(|file| locales.is_empty() || locales.contains(&file.locale.as_str()))
        .filter(|file| domains.is_empty() || domains.iter().any(|d| file.covers_domain(d)))
        .collect();
    Ok(files)
}

/// Find importable catalogues under a directory, sorted by path
pub fn find_catalogues<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, TransferError> {
    let mut catalogues = Vec::new();

    for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
        let entry = entry.map_err(|e| TransferError::Io(e.into()))?;
        let path = entry.path();

        let is_catalogue = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(CATALOGUE_EXTENSION));

        if is_catalogue && CatalogueName::parse(path).is_ok() {
            catalogues.push(path.to_path_buf());
        }
    }

    catalogues.sort();
    Ok(catalogues)
}

/// Collect the `key -> content` map of a file's translations
pub fn export_file(
    storage: &dyn TranslationStorage,
    session: &Session,
    file: &File,
    only_updated: bool,
) -> Result<BTreeMap<String, String>, TransferError> {
    let units = storage.get_translations_from_file(session, file, only_updated)?;

    let mut catalogue = BTreeMap::new();
    for unit in units {
        for translation in &unit.translations {
            catalogue.insert(unit.key().to_string(), translation.content.clone());
        }
    }

    Ok(catalogue)
}

/// Export the file with `hash` as pretty-printed JSON
pub fn export_file_json(
    storage: &dyn TranslationStorage,
    session: &Session,
    hash: &str,
    only_updated: bool,
) -> Result<String, TransferError> {
    let file = storage
        .get_file_by_hash(session, hash)?
        .ok_or_else(|| TransferError::UnknownFile(hash.to_string()))?;

    let catalogue = export_file(storage, session, &file, only_updated)?;
    Ok(serde_json::to_string_pretty(&catalogue)?)
}
