/*!
 * Versioned schema bootstrap.
 *
 * Each entry of `MIGRATIONS` brings the database from the previous version
 * to its own. Missing steps run in order inside one transaction on open.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

// Foreign keys are deferred so a unit of work may stage a unit before the
// file its translations point to.
const V1_TABLES: &str = r#"
    CREATE TABLE files (
        id TEXT PRIMARY KEY,
        hash TEXT NOT NULL UNIQUE,
        locale TEXT NOT NULL,
        path TEXT NOT NULL,
        extension TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_files_locale ON files(locale);

    CREATE TABLE file_domains (
        file_id TEXT NOT NULL REFERENCES files(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        domain TEXT NOT NULL,
        PRIMARY KEY (file_id, domain)
    );
    CREATE INDEX idx_file_domains_domain ON file_domains(domain);

    CREATE TABLE trans_units (
        id TEXT PRIMARY KEY,
        key TEXT NOT NULL,
        domain TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(key, domain)
    );
    CREATE INDEX idx_trans_units_domain ON trans_units(domain);

    CREATE TABLE translations (
        trans_unit_id TEXT NOT NULL REFERENCES trans_units(id) ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
        locale TEXT NOT NULL,
        content TEXT NOT NULL,
        file_id TEXT REFERENCES files(id) ON DELETE SET NULL DEFERRABLE INITIALLY DEFERRED,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        modified_manually INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (trans_unit_id, locale)
    );
    CREATE INDEX idx_translations_locale ON translations(locale);
    CREATE INDEX idx_translations_file ON translations(file_id);
"#;

/// Ordered `(version, statements)` steps
const MIGRATIONS: &[(i32, &str)] = &[(1, V1_TABLES)];

/// Bring the schema up to `SCHEMA_VERSION`, refusing newer databases
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .context("Failed to create schema_version table")?;

    let stored = stored_version(conn)?;
    if stored > SCHEMA_VERSION {
        bail!(
            "Database schema v{} is newer than this build supports (v{})",
            stored,
            SCHEMA_VERSION
        );
    }

    let pending: Vec<_> = MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > stored)
        .collect();

    if pending.is_empty() {
        debug!("Schema already at v{}", stored);
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for (version, statements) in pending {
        info!("Applying schema v{}", version);
        tx.execute_batch(statements)
            .with_context(|| format!("Failed to apply schema v{}", version))?;
        record_version(&tx, *version)?;
    }
    tx.commit()?;

    Ok(())
}

fn stored_version(conn: &Connection) -> Result<i32> {
    let version = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))
        .optional()
        .context("Failed to read schema version")?;
    Ok(version.unwrap_or(0))
}

fn record_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (id, version, updated_at) VALUES (1, ?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
         ON CONFLICT(id) DO UPDATE SET version = excluded.version, updated_at = excluded.updated_at",
        [version],
    )?;
    Ok(())
}
