/*!
 * Shared SQLite connection and session scopes.
 *
 * One `DatabaseConnection` owns the engine handle for a database file and
 * serializes access to it. Callers never touch the handle directly: they
 * open a `Session`, or run a closure in a session scope.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;
use super::session::Session;
use crate::errors::{StorageError, StorageResult};

const IN_MEMORY: &str = ":memory:";

/// Location of the database under the platform data directory
const APP_DIR: &str = "translation-store";
const DB_FILE: &str = "translations.db";

/// Cloneable handle to one SQLite database
#[derive(Clone)]
pub struct DatabaseConnection {
    db_path: PathBuf,
    inner: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open (creating if needed) the database file at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(dir) = db_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        info!("Opening translation database {}", db_path.display());
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Journal mode: {}", mode);

        Self::bootstrap(conn, db_path)
    }

    /// Private in-memory database, mostly for tests
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory translation database");
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::bootstrap(conn, PathBuf::from(IN_MEMORY))
    }

    fn bootstrap(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// `translation-store/translations.db` under the platform data directory
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("No data directory available on this platform"))?;

        Ok(data_dir.join(APP_DIR).join(DB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY
    }

    pub(crate) fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.inner.lock().map_err(|e| {
            StorageError::SessionUnavailable(format!("Connection lock poisoned: {}", e))
        })
    }

    /// Open a new session with an empty unit of work
    pub fn open_session(&self) -> Session {
        Session::new(self.clone())
    }

    /// Run `f` inside a fresh session.
    ///
    /// Staged changes are flushed when `f` succeeds and discarded when it
    /// fails, so the session never outlives the call with pending writes.
    pub fn with_session<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut session = self.open_session();

        match f(&mut session) {
            Ok(value) => {
                session.flush()?;
                Ok(value)
            }
            Err(error) => {
                let discarded = session.clear(None);
                if discarded > 0 {
                    debug!("Discarded {} staged change(s) after failure", discarded);
                }
                Err(error)
            }
        }
    }

    /// `with_session` on tokio's blocking pool, for async callers
    pub async fn with_session_async<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
    {
        let db = self.clone();

        tokio::task::spawn_blocking(move || db.with_session(f))
            .await
            .map_err(|e| {
                E::from(StorageError::SessionUnavailable(format!(
                    "Session task failed: {}",
                    e
                )))
            })?
    }

    /// Row counts and on-disk size of the durable state
    pub fn stats(&self) -> Result<DatabaseStats> {
        let conn = self.lock()?;
        let scalar = |sql: &str| -> Result<i64> {
            conn.query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("Failed to run {}", sql))
        };

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.db_path).map(|meta| meta.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            trans_unit_count: scalar("SELECT COUNT(*) FROM trans_units")?,
            translation_count: scalar("SELECT COUNT(*) FROM translations")?,
            file_count: scalar("SELECT COUNT(*) FROM files")?,
            domain_count: scalar("SELECT COUNT(DISTINCT domain) FROM trans_units")?,
            file_size_bytes,
        })
    }
}

/// Row counts of the durable state
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub trans_unit_count: i64,
    pub translation_count: i64,
    pub file_count: i64,
    pub domain_count: i64,
    /// Size of the main database file; 0 for in-memory databases
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} unit(s), {} translation(s), {} file(s), {} domain(s), {} KB on disk",
            self.trans_unit_count,
            self.translation_count,
            self.file_count,
            self.domain_count,
            self.file_size_bytes / 1024
        )
    }
}
