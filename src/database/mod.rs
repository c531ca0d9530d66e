/*!
 * Database module for persistent storage of translation data.
 *
 * This module provides SQLite-based persistence for:
 * - Translation units and their per-locale translations
 * - Imported files, deduplicated by content hash
 * - Sessions staging writes in a unit of work until flushed
 */

pub mod schema;
pub mod connection;
pub mod session;
pub mod models;
pub mod repository;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{Entity, EntityKind, File, TransUnit, Translation};
pub use session::Session;
