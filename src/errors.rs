/*!
 * Error types for the translation store.
 *
 * This module contains custom error types for the storage contract and for
 * the import/export pipeline built on top of it, using the thiserror crate
 * for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors surfaced by storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// A logical entity name has no registered model class, or the
    /// registry itself is malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The persistence engine rejected a statement (constraint violation,
    /// I/O failure, corrupt database)
    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// The shared connection could not be reached (poisoned lock, panicked
    /// blocking task)
    #[error("Database session unavailable: {0}")]
    SessionUnavailable(String),

    /// Malformed caller input, rejected before any query runs
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorageError {
    /// Build the error returned for an unregistered logical entity name
    pub fn unknown_model(name: &str) -> Self {
        Self::Configuration(format!("No class defined for name \"{}\"", name))
    }

    /// Whether the error came from the persistence engine itself
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::SessionUnavailable(_))
    }
}

/// Result alias used across the storage contract
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while importing or exporting catalogues
#[derive(Error, Debug)]
pub enum TransferError {
    /// The catalogue file name does not follow `<domain>.<locale>.<ext>`
    #[error("Invalid catalogue name: {0}")]
    InvalidCatalogueName(String),

    /// The catalogue content could not be turned into key/value pairs
    #[error("Invalid catalogue content: {0}")]
    InvalidCatalogue(String),

    /// No file is registered under the requested hash
    #[error("No imported file with hash {0}")]
    UnknownFile(String),

    /// Error from the storage layer
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Error reading or writing a catalogue
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing or serializing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
