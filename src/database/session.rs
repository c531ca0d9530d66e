/*!
 * Session and unit of work.
 *
 * A `Session` stages persist/remove requests in memory. Reads replay the
 * staged requests inside a transaction that is always rolled back, so they
 * observe durable state plus the caller's pending changes that apply
 * cleanly. `flush` replays them in a committed transaction.
 */

use log::{debug, warn};
use rusqlite::{Connection, params};

use super::connection::DatabaseConnection;
use super::models::{Entity, EntityKind, File, TransUnit};
use crate::errors::StorageResult;

/// A staged write
#[derive(Debug, Clone)]
enum StagedOp {
    Persist(Entity),
    Remove(Entity),
}

impl StagedOp {
    fn entity(&self) -> &Entity {
        match self {
            StagedOp::Persist(entity) | StagedOp::Remove(entity) => entity,
        }
    }

    fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        match self {
            StagedOp::Persist(Entity::TransUnit(unit)) => write_trans_unit(conn, unit),
            StagedOp::Persist(Entity::File(file)) => write_file(conn, file),
            StagedOp::Remove(Entity::TransUnit(unit)) => {
                conn.execute("DELETE FROM trans_units WHERE id = ?1", [&unit.id])?;
                Ok(())
            }
            StagedOp::Remove(Entity::File(file)) => {
                conn.execute("DELETE FROM files WHERE id = ?1", [&file.id])?;
                Ok(())
            }
        }
    }
}

fn write_trans_unit(conn: &Connection, unit: &TransUnit) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO trans_units (id, key, domain, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            key = excluded.key,
            domain = excluded.domain,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
        params![
            unit.id,
            unit.key(),
            unit.domain,
            unit.created_at,
            unit.updated_at,
        ],
    )?;

    conn.execute("DELETE FROM translations WHERE trans_unit_id = ?1", [&unit.id])?;

    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO translations (
            trans_unit_id, locale, content, file_id, created_at, updated_at, modified_manually
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;

    for translation in &unit.translations {
        stmt.execute(params![
            unit.id,
            translation.locale,
            translation.content,
            translation.file_id,
            translation.created_at,
            translation.updated_at,
            translation.modified_manually,
        ])?;
    }

    Ok(())
}

fn write_file(conn: &Connection, file: &File) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO files (id, hash, locale, path, extension, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            hash = excluded.hash,
            locale = excluded.locale,
            path = excluded.path,
            extension = excluded.extension,
            created_at = excluded.created_at
        "#,
        params![
            file.id,
            file.hash,
            file.locale,
            file.path,
            file.extension,
            file.created_at,
        ],
    )?;

    conn.execute("DELETE FROM file_domains WHERE file_id = ?1", [&file.id])?;

    let mut stmt =
        conn.prepare_cached("INSERT INTO file_domains (file_id, domain) VALUES (?1, ?2)")?;
    for domain in &file.domains {
        stmt.execute(params![file.id, domain])?;
    }

    Ok(())
}

/// Per-caller persistence session owning a unit of work.
///
/// Sessions are not shared between callers: writes need `&mut Session`, and
/// each request or command should open its own.
pub struct Session {
    connection: DatabaseConnection,
    staged: Vec<StagedOp>,
}

impl Session {
    pub(crate) fn new(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            staged: Vec::new(),
        }
    }

    /// Stage an insert-or-update of `entity`
    pub fn stage_persist(&mut self, entity: Entity) {
        debug!("Staging persist of {} {}", entity.kind(), entity.id());
        self.staged.push(StagedOp::Persist(entity));
    }

    /// Stage a deletion of `entity`
    pub fn stage_remove(&mut self, entity: Entity) {
        debug!("Staging removal of {} {}", entity.kind(), entity.id());
        self.staged.push(StagedOp::Remove(entity));
    }

    /// Number of staged changes
    pub fn pending(&self) -> usize {
        self.staged.len()
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Run a query against durable state plus this session's staged changes
    pub fn read<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.connection.lock()?;

        if self.staged.is_empty() {
            return f(&conn);
        }

        // Each op gets its own savepoint: one the engine rejects is left out
        // of the view and reported by `flush` instead.
        let mut tx = conn.transaction()?;
        for op in &self.staged {
            let savepoint = tx.savepoint()?;
            match op.apply(&savepoint) {
                Ok(()) => savepoint.commit()?,
                Err(e) => debug!(
                    "Skipping staged change to {} {} in read: {}",
                    op.entity().kind(),
                    op.entity().id(),
                    e
                ),
            }
        }
        let result = f(&tx);
        tx.rollback()?;

        result
    }

    /// Commit every staged change in one transaction
    pub fn flush(&mut self) -> StorageResult<usize> {
        self.commit(|_| true)
    }

    /// Commit only the staged changes that target `entity`
    pub fn flush_entity(&mut self, entity: &Entity) -> StorageResult<usize> {
        let kind = entity.kind();
        let id = entity.id().to_string();
        self.commit(move |op| op.entity().kind() == kind && op.entity().id() == id)
    }

    // On failure the transaction rolls back and the staged changes are kept
    fn commit<P>(&mut self, selected: P) -> StorageResult<usize>
    where
        P: Fn(&StagedOp) -> bool,
    {
        if !self.staged.iter().any(&selected) {
            return Ok(0);
        }

        let mut conn = self.connection.lock()?;
        let tx = conn.transaction()?;

        let mut committed = 0;
        for op in self.staged.iter().filter(|op| selected(op)) {
            op.apply(&tx)?;
            committed += 1;
        }
        tx.commit()?;
        drop(conn);

        self.staged.retain(|op| !selected(op));
        debug!("Flushed {} staged change(s)", committed);

        Ok(committed)
    }

    /// Discard staged changes, all of them or only those of one kind.
    ///
    /// Durable data is untouched. Returns the number of discarded changes.
    pub fn clear(&mut self, kind: Option<EntityKind>) -> usize {
        let before = self.staged.len();
        match kind {
            Some(kind) => {
                let kind = kind.staged_kind();
                self.staged.retain(|op| op.entity().kind() != kind);
            }
            None => self.staged.clear(),
        }
        before - self.staged.len()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.staged.is_empty() {
            warn!(
                "Session dropped with {} unflushed change(s); discarding them",
                self.staged.len()
            );
        }
    }
}
