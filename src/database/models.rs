/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted translation data.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Longest key, in characters, a translation unit can carry
pub const MAX_KEY_LENGTH: usize = 255;

/// Truncate a key to `MAX_KEY_LENGTH` characters (not bytes)
pub fn truncate_key(key: &str) -> &str {
    match key.char_indices().nth(MAX_KEY_LENGTH) {
        Some((index, _)) => &key[..index],
        None => key,
    }
}

/// Current UTC time as a fixed-width RFC 3339 string.
///
/// Fixed microsecond precision keeps lexical and chronological order equal,
/// which the "updated since import" queries rely on.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Entity kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A translation unit (key + domain)
    TransUnit,
    /// A per-locale translation owned by a unit
    Translation,
    /// An imported translation file
    File,
}

impl EntityKind {
    /// Logical name used in configuration and registry lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TransUnit => "trans_unit",
            EntityKind::Translation => "translation",
            EntityKind::File => "file",
        }
    }

    /// Kind under which writes to this entity are staged.
    ///
    /// Translations are written together with their unit.
    pub fn staged_kind(&self) -> EntityKind {
        match self {
            EntityKind::Translation => EntityKind::TransUnit,
            other => *other,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trans_unit" => Ok(EntityKind::TransUnit),
            "translation" => Ok(EntityKind::Translation),
            "file" => Ok(EntityKind::File),
            _ => Err(anyhow::anyhow!("Invalid entity kind: {}", s)),
        }
    }
}

/// Translation of a unit into one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Locale code (e.g. "fr", "pt_BR")
    pub locale: String,
    /// Translated content
    pub content: String,
    /// File this translation was last imported from
    pub file_id: Option<String>,
    /// Creation (or last import) timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
    /// Whether the content was edited outside of an import
    pub modified_manually: bool,
}

impl Translation {
    /// Create a new translation
    pub fn new(locale: &str, content: &str) -> Self {
        let now = now_timestamp();
        Self {
            locale: locale.to_string(),
            content: content.to_string(),
            file_id: None,
            created_at: now.clone(),
            updated_at: now,
            modified_manually: false,
        }
    }

    /// Check if the translation changed after it was imported
    pub fn is_updated_since_import(&self) -> bool {
        self.updated_at > self.created_at
    }
}

/// Translation unit record: a key inside a domain with one translation per locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransUnit {
    /// Unique identifier (UUID)
    pub id: String,
    /// Translation key, at most `MAX_KEY_LENGTH` characters
    pub(crate) key: String,
    /// Domain the key belongs to
    pub domain: String,
    /// Translations sorted by locale
    pub translations: Vec<Translation>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
}

impl TransUnit {
    /// Create a new translation unit with no translations
    pub fn new(key: &str, domain: &str) -> Self {
        let now = now_timestamp();
        Self {
            id: new_id(),
            key: truncate_key(key).to_string(),
            domain: domain.to_string(),
            translations: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the key, truncated to `MAX_KEY_LENGTH` characters
    pub fn set_key(&mut self, key: &str) {
        self.key = truncate_key(key).to_string();
    }

    /// Get the translation for a locale
    pub fn translation(&self, locale: &str) -> Option<&Translation> {
        self.translations.iter().find(|t| t.locale == locale)
    }

    /// Get the translated content for a locale
    pub fn content(&self, locale: &str) -> Option<&str> {
        self.translation(locale).map(|t| t.content.as_str())
    }

    pub fn has_translation(&self, locale: &str) -> bool {
        self.translation(locale).is_some()
    }

    /// Locales this unit is translated into
    pub fn locales(&self) -> Vec<&str> {
        self.translations.iter().map(|t| t.locale.as_str()).collect()
    }

    /// Edit (or add) the translation for a locale.
    ///
    /// Marks the translation as manually modified and bumps both timestamps
    /// of the translation and the unit.
    pub fn set_translation(&mut self, locale: &str, content: &str) -> &mut Translation {
        let now = now_timestamp();
        self.updated_at = now.clone();

        let index = self.slot(locale, &now);
        let translation = &mut self.translations[index];
        translation.content = content.to_string();
        translation.updated_at = now;
        translation.modified_manually = true;
        translation
    }

    /// Store content coming from an import of `file_id`.
    ///
    /// Resets the translation's import baseline: `created_at` and
    /// `updated_at` both become the import time and the manual flag is cleared.
    pub fn set_imported_translation(
        &mut self,
        locale: &str,
        content: &str,
        file_id: &str,
    ) -> &mut Translation {
        let now = now_timestamp();
        self.updated_at = now.clone();

        let index = self.slot(locale, &now);
        let translation = &mut self.translations[index];
        translation.content = content.to_string();
        translation.file_id = Some(file_id.to_string());
        translation.created_at = now.clone();
        translation.updated_at = now;
        translation.modified_manually = false;
        translation
    }

    /// Remove the translation for a locale, returning it if present
    pub fn remove_translation(&mut self, locale: &str) -> Option<Translation> {
        let index = self.translations.iter().position(|t| t.locale == locale)?;
        self.updated_at = now_timestamp();
        Some(self.translations.remove(index))
    }

    // Index of the locale's translation, inserting an empty one created at
    // `now` in sorted position
    fn slot(&mut self, locale: &str, now: &str) -> usize {
        match self
            .translations
            .binary_search_by(|t| t.locale.as_str().cmp(locale))
        {
            Ok(index) => index,
            Err(index) => {
                let mut translation = Translation::new(locale, "");
                translation.created_at = now.to_string();
                translation.updated_at = now.to_string();
                self.translations.insert(index, translation);
                index
            }
        }
    }
}

/// Imported translation file record, identified by its content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Unique identifier (UUID)
    pub id: String,
    /// SHA256 hash of the file content
    pub hash: String,
    /// Locale of the catalogue
    pub locale: String,
    /// Domains covered by the file
    pub domains: BTreeSet<String>,
    /// Path the file was imported from
    pub path: String,
    /// File extension (e.g. "json")
    pub extension: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl File {
    /// Create a new file record from its path and content
    pub fn new<I, S>(path: &str, locale: &str, domains: I, content: &[u8]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let extension = Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            id: new_id(),
            hash: Self::hash_content(content),
            locale: locale.to_string(),
            domains: domains.into_iter().map(Into::into).collect(),
            path: path.to_string(),
            extension,
            created_at: now_timestamp(),
        }
    }

    /// Hash file content for deduplication
    pub fn hash_content(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }

    pub fn covers_domain(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }
}

/// Any entity the storage layer can persist or remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    TransUnit(TransUnit),
    File(File),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::TransUnit(unit) => &unit.id,
            Entity::File(file) => &file.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::TransUnit(_) => EntityKind::TransUnit,
            Entity::File(_) => EntityKind::File,
        }
    }
}

impl From<TransUnit> for Entity {
    fn from(unit: TransUnit) -> Self {
        Entity::TransUnit(unit)
    }
}

impl From<File> for Entity {
    fn from(file: File) -> Self {
        Entity::File(file)
    }
}
