/*!
 * SQLite queries over translation units.
 */

use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Params, Row, params, params_from_iter};
use std::collections::{BTreeMap, BTreeSet};

use super::{PageRequest, TransUnitFilters, TransUnitRepository};
use crate::database::models::{File, TransUnit, Translation};
use crate::errors::StorageResult;

const UNIT_COLUMNS: &str = "tu.id, tu.key, tu.domain, tu.created_at, tu.updated_at";

/// Translation unit repository backed by the `trans_units` and
/// `translations` tables
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTransUnitRepository;

impl SqliteTransUnitRepository {
    pub fn new() -> Self {
        Self
    }
}

fn map_unit_row(row: &Row) -> rusqlite::Result<TransUnit> {
    Ok(TransUnit {
        id: row.get(0)?,
        key: row.get(1)?,
        domain: row.get(2)?,
        translations: Vec::new(),
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn query_units<P: Params>(conn: &Connection, sql: &str, params: P) -> rusqlite::Result<Vec<TransUnit>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_unit_row)?;
    let units: Vec<TransUnit> = rows.collect::<rusqlite::Result<_>>()?;
    Ok(units)
}

fn load_translations(conn: &Connection, unit_id: &str) -> rusqlite::Result<Vec<Translation>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT locale, content, file_id, created_at, updated_at, modified_manually
        FROM translations
        WHERE trans_unit_id = ?1
        ORDER BY locale
        "#,
    )?;

    let rows = stmt.query_map([unit_id], |row| {
        Ok(Translation {
            locale: row.get(0)?,
            content: row.get(1)?,
            file_id: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            modified_manually: row.get(5)?,
        })
    })?;

    let translations: Vec<Translation> = rows.collect::<rusqlite::Result<_>>()?;
    Ok(translations)
}

// Attach each unit's translations, keeping only those accepted by `keep`
fn hydrate<P>(conn: &Connection, mut units: Vec<TransUnit>, keep: P) -> StorageResult<Vec<TransUnit>>
where
    P: Fn(&Translation) -> bool,
{
    for unit in &mut units {
        unit.translations = load_translations(conn, &unit.id)?
            .into_iter()
            .filter(|t| keep(t))
            .collect();
    }
    Ok(units)
}

fn find_one<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Option<TransUnit>> {
    let unit = conn.query_row(sql, params, map_unit_row).optional()?;

    match unit {
        Some(mut unit) => {
            unit.translations = load_translations(conn, &unit.id)?;
            Ok(Some(unit))
        }
        None => Ok(None),
    }
}

fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// WHERE clause shared by `list` and `count`
struct FilterClause {
    sql: String,
    params: Vec<Value>,
}

fn filter_clause(locales: Option<&[&str]>, filters: &TransUnitFilters) -> FilterClause {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if filters.search {
        if let Some(domain) = filters.domain.as_deref().filter(|d| !d.is_empty()) {
            conditions.push("tu.domain LIKE ? ESCAPE '\\'".to_string());
            params.push(Value::Text(like_pattern(domain)));
        }
        if let Some(key) = filters.key.as_deref().filter(|k| !k.is_empty()) {
            conditions.push("tu.key LIKE ? ESCAPE '\\'".to_string());
            params.push(Value::Text(like_pattern(key)));
        }
    }

    if let Some(locales) = locales {
        if locales.is_empty() {
            conditions.push("0".to_string());
        } else {
            let placeholders = vec!["?"; locales.len()].join(", ");
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM translations t WHERE t.trans_unit_id = tu.id AND t.locale IN ({}))",
                placeholders
            ));
            params.extend(locales.iter().map(|locale| Value::Text(locale.to_string())));

            for locale in locales {
                if let Some(content) = filters.content.get(*locale).filter(|c| !c.is_empty()) {
                    conditions.push(
                        "EXISTS (SELECT 1 FROM translations t WHERE t.trans_unit_id = tu.id \
                         AND t.locale = ? AND t.content LIKE ? ESCAPE '\\')"
                            .to_string(),
                    );
                    params.push(Value::Text(locale.to_string()));
                    params.push(Value::Text(like_pattern(content)));
                }
            }
        }
    }

    let sql = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    FilterClause { sql, params }
}

impl TransUnitRepository for SqliteTransUnitRepository {
    fn find_by_id(&self, conn: &Connection, id: &str) -> StorageResult<Option<TransUnit>> {
        find_one(
            conn,
            &format!("SELECT {} FROM trans_units tu WHERE tu.id = ?1", UNIT_COLUMNS),
            [id],
        )
    }

    fn find_one_by_key_and_domain(
        &self,
        conn: &Connection,
        key: &str,
        domain: &str,
    ) -> StorageResult<Option<TransUnit>> {
        find_one(
            conn,
            &format!(
                "SELECT {} FROM trans_units tu WHERE tu.key = ?1 AND tu.domain = ?2",
                UNIT_COLUMNS
            ),
            [key, domain],
        )
    }

    fn all_domains(&self, conn: &Connection) -> StorageResult<Vec<String>> {
        let mut stmt = conn.prepare("SELECT DISTINCT domain FROM trans_units ORDER BY domain")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let domains: Vec<String> = rows.collect::<rusqlite::Result<_>>()?;
        Ok(domains)
    }

    fn all_domains_by_locale(
        &self,
        conn: &Connection,
    ) -> StorageResult<BTreeMap<String, BTreeSet<String>>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT t.locale, tu.domain
            FROM translations t
            JOIN trans_units tu ON tu.id = t.trans_unit_id
            ORDER BY t.locale, tu.domain
            "#,
        )?;

        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut domains_by_locale: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            let (locale, domain) = row?;
            domains_by_locale.entry(locale).or_default().insert(domain);
        }

        Ok(domains_by_locale)
    }

    fn all_by_locale_and_domain(
        &self,
        conn: &Connection,
        locale: &str,
        domain: &str,
    ) -> StorageResult<Vec<TransUnit>> {
        let sql = format!(
            r#"
            SELECT {} FROM trans_units tu
            WHERE tu.domain = ?1
              AND EXISTS (SELECT 1 FROM translations t WHERE t.trans_unit_id = tu.id AND t.locale = ?2)
            ORDER BY tu.key
            "#,
            UNIT_COLUMNS
        );

        let units = query_units(conn, &sql, [domain, locale])?;
        hydrate(conn, units, |t| t.locale == locale)
    }

    fn list(
        &self,
        conn: &Connection,
        locales: Option<&[&str]>,
        page: &PageRequest,
        filters: &TransUnitFilters,
    ) -> StorageResult<Vec<TransUnit>> {
        let clause = filter_clause(locales, filters);
        let sql = format!(
            "SELECT {} FROM trans_units tu{} ORDER BY {} {}, tu.id ASC LIMIT ? OFFSET ?",
            UNIT_COLUMNS,
            clause.sql,
            filters.sort.column(),
            filters.order
        );

        let mut params = clause.params;
        params.push(Value::Integer(i64::from(page.rows())));
        params.push(Value::Integer(page.offset()));

        let units = query_units(conn, &sql, params_from_iter(params.iter()))?;
        debug!(
            "Listed {} translation unit(s) for page {} ({} rows)",
            units.len(),
            page.page(),
            page.rows()
        );

        hydrate(conn, units, |t| {
            locales.is_none_or(|locales| locales.contains(&t.locale.as_str()))
        })
    }

    fn count(
        &self,
        conn: &Connection,
        locales: Option<&[&str]>,
        filters: &TransUnitFilters,
    ) -> StorageResult<i64> {
        let clause = filter_clause(locales, filters);
        let sql = format!("SELECT COUNT(*) FROM trans_units tu{}", clause.sql);

        let count: i64 = conn.query_row(&sql, params_from_iter(clause.params.iter()), |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    fn translations_for_file(
        &self,
        conn: &Connection,
        file: &File,
        only_updated: bool,
    ) -> StorageResult<Vec<TransUnit>> {
        let sql = format!(
            r#"
            SELECT {} FROM trans_units tu
            WHERE EXISTS (
                SELECT 1 FROM translations t
                WHERE t.trans_unit_id = tu.id
                  AND t.file_id = ?1
                  AND (?2 = 0 OR t.updated_at > t.created_at)
            )
            ORDER BY tu.key
            "#,
            UNIT_COLUMNS
        );

        let units = query_units(conn, &sql, params![file.id, only_updated])?;
        hydrate(conn, units, |t| {
            t.file_id.as_deref() == Some(file.id.as_str())
                && (!only_updated || t.is_updated_since_import())
        })
    }
}
