/*!
 * Storage contract for translation data and its database-backed adapter.
 *
 * Every operation takes the caller's `Session`. Writes are staged in the
 * session and only become durable on `flush`; reads see durable state plus
 * whatever the session has staged.
 */

use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use crate::app_config::StorageConfig;
use crate::database::models::truncate_key;
use crate::database::repository::{
    FileRepository, PageRequest, SqliteFileRepository, SqliteTransUnitRepository,
    TransUnitFilters, TransUnitRepository,
};
use crate::database::{Entity, File, Session, TransUnit};
use crate::errors::StorageResult;

pub mod registry;

pub use registry::{ModelClass, ModelRegistry};

/// Persistence and lookup of translation units and files
pub trait TranslationStorage: Send + Sync {
    /// Stage an insert-or-update of `entity`
    fn persist(&self, session: &mut Session, entity: Entity);

    /// Stage a deletion of `entity`
    fn remove(&self, session: &mut Session, entity: Entity);

    /// Commit staged changes, all of them or only those targeting `entity`
    fn flush(&self, session: &mut Session, entity: Option<&Entity>) -> StorageResult<usize>;

    /// Discard staged changes, all of them or those of one logical name
    fn clear(&self, session: &mut Session, entity_name: Option<&str>) -> StorageResult<usize>;

    /// Concrete model type registered for a logical name
    fn get_model_class(&self, name: &str) -> StorageResult<&str>;

    fn get_files_by_locales_and_domains(
        &self,
        session: &Session,
        locales: &[&str],
        domains: &[&str],
    ) -> StorageResult<Vec<File>>;

    fn get_file_by_hash(&self, session: &Session, hash: &str) -> StorageResult<Option<File>>;

    fn get_file_by_id(&self, session: &Session, id: &str) -> StorageResult<Option<File>>;

    fn get_all_files(&self, session: &Session) -> StorageResult<Vec<File>>;

    fn get_trans_unit_domains(&self, session: &Session) -> StorageResult<Vec<String>>;

    fn get_trans_unit_by_id(&self, session: &Session, id: &str) -> StorageResult<Option<TransUnit>>;

    /// Lookup by key and domain. Keys are truncated to 255 characters first.
    fn get_trans_unit_by_key_and_domain(
        &self,
        session: &Session,
        key: &str,
        domain: &str,
    ) -> StorageResult<Option<TransUnit>>;

    fn get_trans_unit_domains_by_locale(
        &self,
        session: &Session,
    ) -> StorageResult<BTreeMap<String, BTreeSet<String>>>;

    fn get_trans_units_by_locale_and_domain(
        &self,
        session: &Session,
        locale: &str,
        domain: &str,
    ) -> StorageResult<Vec<TransUnit>>;

    /// One page of units. `rows` and `page` must both be at least 1.
    fn get_trans_unit_list(
        &self,
        session: &Session,
        locales: Option<&[&str]>,
        rows: u32,
        page: u32,
        filters: &TransUnitFilters,
    ) -> StorageResult<Vec<TransUnit>>;

    fn count_trans_units(
        &self,
        session: &Session,
        locales: Option<&[&str]>,
        filters: &TransUnitFilters,
    ) -> StorageResult<i64>;

    fn get_translations_from_file(
        &self,
        session: &Session,
        file: &File,
        only_updated: bool,
    ) -> StorageResult<Vec<TransUnit>>;
}

/// `TranslationStorage` over the SQLite repositories
pub struct DatabaseStorage {
    manager_name: String,
    registry: ModelRegistry,
    trans_units: Box<dyn TransUnitRepository>,
    files: Box<dyn FileRepository>,
}

impl DatabaseStorage {
    /// Create a storage adapter with the SQLite repositories
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        Self::with_repositories(
            config,
            Box::new(SqliteTransUnitRepository::new()),
            Box::new(SqliteFileRepository::new()),
        )
    }

    /// Create a storage adapter with custom repositories
    pub fn with_repositories(
        config: &StorageConfig,
        trans_units: Box<dyn TransUnitRepository>,
        files: Box<dyn FileRepository>,
    ) -> StorageResult<Self> {
        let registry = ModelRegistry::from_classes(&config.classes)?;
        debug!(
            "Storage bound to manager '{}' with models: {}",
            config.manager_name,
            registry.names().collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            manager_name: config.manager_name.clone(),
            registry,
            trans_units,
            files,
        })
    }

    pub fn manager_name(&self) -> &str {
        &self.manager_name
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}

impl TranslationStorage for DatabaseStorage {
    fn persist(&self, session: &mut Session, entity: Entity) {
        session.stage_persist(entity);
    }

    fn remove(&self, session: &mut Session, entity: Entity) {
        session.stage_remove(entity);
    }

    fn flush(&self, session: &mut Session, entity: Option<&Entity>) -> StorageResult<usize> {
        match entity {
            Some(entity) => session.flush_entity(entity),
            None => session.flush(),
        }
    }

    fn clear(&self, session: &mut Session, entity_name: Option<&str>) -> StorageResult<usize> {
        let kind = entity_name.map(|name| self.registry.kind(name)).transpose()?;
        Ok(session.clear(kind))
    }

    fn get_model_class(&self, name: &str) -> StorageResult<&str> {
        self.registry
            .model_class(name)
            .map(|class| class.type_name.as_str())
    }

    fn get_files_by_locales_and_domains(
        &self,
        session: &Session,
        locales: &[&str],
        domains: &[&str],
    ) -> StorageResult<Vec<File>> {
        session.read(|conn| self.files.find_for_locales_and_domains(conn, locales, domains))
    }

    fn get_file_by_hash(&self, session: &Session, hash: &str) -> StorageResult<Option<File>> {
        session.read(|conn| self.files.find_one_by_hash(conn, hash))
    }

    fn get_file_by_id(&self, session: &Session, id: &str) -> StorageResult<Option<File>> {
        session.read(|conn| self.files.find_by_id(conn, id))
    }

    fn get_all_files(&self, session: &Session) -> StorageResult<Vec<File>> {
        session.read(|conn| self.files.find_all(conn))
    }

    fn get_trans_unit_domains(&self, session: &Session) -> StorageResult<Vec<String>> {
        session.read(|conn| self.trans_units.all_domains(conn))
    }

    fn get_trans_unit_by_id(&self, session: &Session, id: &str) -> StorageResult<Option<TransUnit>> {
        session.read(|conn| self.trans_units.find_by_id(conn, id))
    }

    fn get_trans_unit_by_key_and_domain(
        &self,
        session: &Session,
        key: &str,
        domain: &str,
    ) -> StorageResult<Option<TransUnit>> {
        let key = truncate_key(key);
        session.read(|conn| self.trans_units.find_one_by_key_and_domain(conn, key, domain))
    }

    fn get_trans_unit_domains_by_locale(
        &self,
        session: &Session,
    ) -> StorageResult<BTreeMap<String, BTreeSet<String>>> {
        session.read(|conn| self.trans_units.all_domains_by_locale(conn))
    }

    fn get_trans_units_by_locale_and_domain(
        &self,
        session: &Session,
        locale: &str,
        domain: &str,
    ) -> StorageResult<Vec<TransUnit>> {
        session.read(|conn| self.trans_units.all_by_locale_and_domain(conn, locale, domain))
    }

    fn get_trans_unit_list(
        &self,
        session: &Session,
        locales: Option<&[&str]>,
        rows: u32,
        page: u32,
        filters: &TransUnitFilters,
    ) -> StorageResult<Vec<TransUnit>> {
        let page = PageRequest::new(rows, page)?;
        session.read(|conn| self.trans_units.list(conn, locales, &page, filters))
    }

    fn count_trans_units(
        &self,
        session: &Session,
        locales: Option<&[&str]>,
        filters: &TransUnitFilters,
    ) -> StorageResult<i64> {
        session.read(|conn| self.trans_units.count(conn, locales, filters))
    }

    fn get_translations_from_file(
        &self,
        session: &Session,
        file: &File,
        only_updated: bool,
    ) -> StorageResult<Vec<TransUnit>> {
        session.read(|conn| self.trans_units.translations_for_file(conn, file, only_updated))
    }
}
