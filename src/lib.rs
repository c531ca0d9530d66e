/*!
 * # translation-store
 *
 * A storage layer for translation units and the catalogue files they were
 * imported from, backed by SQLite.
 *
 * ## Features
 *
 * - Translation units identified by key and domain, with one translation
 *   per locale
 * - Imported file records identified by a content hash
 * - Unit-of-work sessions: writes are staged and committed on flush
 * - Paginated, filtered and sorted unit listings
 * - JSON catalogue import and export
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite connection, schema, sessions and repositories:
 *   - `database::models`: Translation units, translations and files
 *   - `database::session`: Unit of work over the shared connection
 *   - `database::repository`: Query layer for units and files
 * - `storage`: The `TranslationStorage` contract and its database adapter
 * - `transfer`: Catalogue import and export
 * - `locale_utils`: Locale code validation and normalization
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod locale_utils;
pub mod storage;
pub mod transfer;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{DatabaseConnection, Entity, EntityKind, File, Session, TransUnit, Translation};
pub use database::repository::{SortColumn, SortOrder, TransUnitFilters};
pub use errors::{StorageError, StorageResult, TransferError};
pub use locale_utils::{locales_match, normalize_locale};
pub use storage::{DatabaseStorage, TranslationStorage};
