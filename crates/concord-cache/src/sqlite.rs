use chrono::Utc;
use concord_models::cache_schema::{CacheRow, CACHE_TABLE_DDL};
use rusqlite::{Connection, Row};

use crate::error::CacheError;

const SELECT_COLUMNS: &str =
    "SELECT key, category, value_json, source, subject, created_at, expires_at FROM dataset_entries";

/// SQLite accessor for the shared dataset store.
///
/// The database is written by external data pipelines; concord only reads it
/// in production.
pub struct SqliteReader {
    conn: Connection,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<CacheRow> {
    Ok(CacheRow {
        key: row.get(0)?,
        category: row.get(1)?,
        value_json: row.get(2)?,
        source: row.get(3)?,
        subject: row.get(4)?,
        created_at: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

impl SqliteReader {
    /// Open a read-only connection to the shared cache database.
    pub fn open(path: &str) -> Result<Self, CacheError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database with the schema created. Writable so tests can seed it.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CACHE_TABLE_DDL)?;
        Ok(Self { conn })
    }

    /// Get a single entry by key. Returns None if not found or expired.
    pub fn get(&self, key: &str) -> Result<Option<CacheRow>, CacheError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_COLUMNS} WHERE key = ?1 AND expires_at > ?2"))?;

        match stmt.query_row(rusqlite::params![key, now], map_row) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CacheError::Sqlite(e)),
        }
    }

    /// All non-expired entries for a subject, ordered by key.
    pub fn get_by_subject(&self, subject: &str) -> Result<Vec<CacheRow>, CacheError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(&format!(
            "{SELECT_COLUMNS} WHERE subject = ?1 AND expires_at > ?2 ORDER BY key"
        ))?;

        let rows = stmt
            .query_map(rusqlite::params![subject, now], map_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Insert or replace an entry. Pipelines normally write directly; this is for
    /// tests and local seeding.
    pub fn insert(&self, row: &CacheRow) -> Result<(), CacheError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO dataset_entries \
             (key, category, value_json, source, subject, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                row.key,
                row.category,
                row.value_json,
                row.source,
                row.subject,
                row.created_at,
                row.expires_at,
            ],
        )?;
        Ok(())
    }
}
