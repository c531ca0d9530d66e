/*!
 * Repository layer for database queries.
 *
 * This module defines the typed query interfaces for translation units and
 * files, and the filter and pagination types they accept. The SQLite
 * implementations live in the submodules and run against whatever
 * connection view the session hands them.
 */

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::models::{File, TransUnit};
use crate::errors::{StorageError, StorageResult};

pub mod file;
pub mod trans_unit;

pub use file::SqliteFileRepository;
pub use trans_unit::SqliteTransUnitRepository;

/// Default page size for unit listings
pub const DEFAULT_ROWS: u32 = 20;

/// Queries over translation units
pub trait TransUnitRepository: Send + Sync {
    fn find_by_id(&self, conn: &Connection, id: &str) -> StorageResult<Option<TransUnit>>;

    /// Find the unit with this exact key in a domain
    fn find_one_by_key_and_domain(
        &self,
        conn: &Connection,
        key: &str,
        domain: &str,
    ) -> StorageResult<Option<TransUnit>>;

    /// Distinct domains across all units, sorted
    fn all_domains(&self, conn: &Connection) -> StorageResult<Vec<String>>;

    /// Distinct domains per translated locale
    fn all_domains_by_locale(
        &self,
        conn: &Connection,
    ) -> StorageResult<BTreeMap<String, BTreeSet<String>>>;

    /// Units of a domain translated into a locale, carrying only that locale
    fn all_by_locale_and_domain(
        &self,
        conn: &Connection,
        locale: &str,
        domain: &str,
    ) -> StorageResult<Vec<TransUnit>>;

    /// One page of units matching the filters
    fn list(
        &self,
        conn: &Connection,
        locales: Option<&[&str]>,
        page: &PageRequest,
        filters: &TransUnitFilters,
    ) -> StorageResult<Vec<TransUnit>>;

    /// Number of units matching the filters, ignoring pagination
    fn count(
        &self,
        conn: &Connection,
        locales: Option<&[&str]>,
        filters: &TransUnitFilters,
    ) -> StorageResult<i64>;

    /// Units with translations imported from `file`, carrying only those
    fn translations_for_file(
        &self,
        conn: &Connection,
        file: &File,
        only_updated: bool,
    ) -> StorageResult<Vec<TransUnit>>;
}

/// Queries over imported files
pub trait FileRepository: Send + Sync {
    fn find_by_id(&self, conn: &Connection, id: &str) -> StorageResult<Option<File>>;

    fn find_one_by_hash(&self, conn: &Connection, hash: &str) -> StorageResult<Option<File>>;

    /// Files whose locale is in `locales` and that cover any of `domains`
    fn find_for_locales_and_domains(
        &self,
        conn: &Connection,
        locales: &[&str],
        domains: &[&str],
    ) -> StorageResult<Vec<File>>;

    fn find_all(&self, conn: &Connection) -> StorageResult<Vec<File>>;
}

/// Validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    rows: u32,
    page: u32,
}

impl PageRequest {
    /// Build a page request, rejecting zero rows or a zero page index
    pub fn new(rows: u32, page: u32) -> StorageResult<Self> {
        if rows < 1 {
            return Err(StorageError::InvalidArgument(format!(
                "rows must be at least 1, got {}",
                rows
            )));
        }
        if page < 1 {
            return Err(StorageError::InvalidArgument(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        Ok(Self { rows, page })
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Number of rows skipped before this page
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.rows)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            page: 1,
        }
    }
}

/// Column unit listings are sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Key,
    Domain,
    Id,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            SortColumn::Key => "tu.key",
            SortColumn::Domain => "tu.domain",
            SortColumn::Id => "tu.id",
            SortColumn::CreatedAt => "tu.created_at",
            SortColumn::UpdatedAt => "tu.updated_at",
        }
    }
}

impl std::str::FromStr for SortColumn {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "key" => Ok(SortColumn::Key),
            "domain" => Ok(SortColumn::Domain),
            "id" => Ok(SortColumn::Id),
            "created_at" => Ok(SortColumn::CreatedAt),
            "updated_at" => Ok(SortColumn::UpdatedAt),
            _ => Err(anyhow::anyhow!("Invalid sort column: {}", s)),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

/// Criteria for listing and counting units.
///
/// `domain` and `key` are substring filters applied only when `search` is
/// set. `content` maps a locale to a substring its translation must contain;
/// an entry applies only when its locale is among the requested locales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransUnitFilters {
    #[serde(default, rename = "_search")]
    pub search: bool,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub content: BTreeMap<String, String>,
    #[serde(default)]
    pub sort: SortColumn,
    #[serde(default)]
    pub order: SortOrder,
}

impl TransUnitFilters {
    /// Filter on a domain substring (enables search)
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.search = true;
        self.domain = Some(domain.to_string());
        self
    }

    /// Filter on a key substring (enables search)
    pub fn with_key(mut self, key: &str) -> Self {
        self.search = true;
        self.key = Some(key.to_string());
        self
    }

    /// Filter on a substring of the translation in `locale`
    pub fn with_content(mut self, locale: &str, content: &str) -> Self {
        self.content.insert(locale.to_string(), content.to_string());
        self
    }

    pub fn sorted_by(mut self, sort: SortColumn, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }
}
