/*!
 * SQLite queries over imported files.
 */

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params, Row, params_from_iter};
use std::collections::BTreeSet;

use super::FileRepository;
use crate::database::models::File;
use crate::errors::StorageResult;

const FILE_COLUMNS: &str = "f.id, f.hash, f.locale, f.path, f.extension, f.created_at";

/// File repository backed by the `files` and `file_domains` tables
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteFileRepository;

impl SqliteFileRepository {
    pub fn new() -> Self {
        Self
    }
}

fn map_file_row(row: &Row) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get(0)?,
        hash: row.get(1)?,
        locale: row.get(2)?,
        domains: BTreeSet::new(),
        path: row.get(3)?,
        extension: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn load_domains(conn: &Connection, file_id: &str) -> rusqlite::Result<BTreeSet<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT domain FROM file_domains WHERE file_id = ?1 ORDER BY domain")?;
    let rows = stmt.query_map([file_id], |row| row.get(0))?;
    let domains: BTreeSet<String> = rows.collect::<rusqlite::Result<_>>()?;
    Ok(domains)
}

fn query_files<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Vec<File>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_file_row)?;
    let mut files: Vec<File> = rows.collect::<rusqlite::Result<_>>()?;

    for file in &mut files {
        file.domains = load_domains(conn, &file.id)?;
    }
    Ok(files)
}

fn find_one<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Option<File>> {
    let file = conn.query_row(sql, params, map_file_row).optional()?;

    match file {
        Some(mut file) => {
            file.domains = load_domains(conn, &file.id)?;
            Ok(Some(file))
        }
        None => Ok(None),
    }
}

impl FileRepository for SqliteFileRepository {
    fn find_by_id(&self, conn: &Connection, id: &str) -> StorageResult<Option<File>> {
        find_one(
            conn,
            &format!("SELECT {} FROM files f WHERE f.id = ?1", FILE_COLUMNS),
            [id],
        )
    }

    fn find_one_by_hash(&self, conn: &Connection, hash: &str) -> StorageResult<Option<File>> {
        find_one(
            conn,
            &format!("SELECT {} FROM files f WHERE f.hash = ?1", FILE_COLUMNS),
            [hash],
        )
    }

    fn find_for_locales_and_domains(
        &self,
        conn: &Connection,
        locales: &[&str],
        domains: &[&str],
    ) -> StorageResult<Vec<File>> {
        if locales.is_empty() || domains.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {} FROM files f
            WHERE f.locale IN ({})
              AND EXISTS (
                SELECT 1 FROM file_domains fd
                WHERE fd.file_id = f.id AND fd.domain IN ({})
              )
            ORDER BY f.path, f.id
            "#,
            FILE_COLUMNS,
            vec!["?"; locales.len()].join(", "),
            vec!["?"; domains.len()].join(", ")
        );

        let params: Vec<Value> = locales
            .iter()
            .chain(domains.iter())
            .map(|value| Value::Text(value.to_string()))
            .collect();

        query_files(conn, &sql, params_from_iter(params.iter()))
    }

    fn find_all(&self, conn: &Connection) -> StorageResult<Vec<File>> {
        query_files(
            conn,
            &format!("SELECT {} FROM files f ORDER BY f.path, f.id", FILE_COLUMNS),
            [],
        )
    }
}
