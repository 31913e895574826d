//! Manifest database connection and operations.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;

use super::ManifestEntry;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("schema version {found} is newer than supported {supported}")]
    VersionTooNew { found: i32, supported: i32 },

    #[error("invalid timestamp in manifest row for {0}")]
    InvalidTimestamp(String),
}

/// Durable mapping from document path to last-indexed state.
///
/// Read in full at the start of every indexing pass, written entry-by-entry
/// as documents are processed, so a crash mid-pass leaves a valid if
/// incomplete manifest that the next incremental pass resumes from.
pub struct ManifestDb {
    conn: Connection,
}

impl ManifestDb {
    /// Open or create a manifest database at the given path.
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ManifestError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Read the whole manifest, keyed by path.
    pub fn load_all(&self) -> Result<BTreeMap<String, ManifestEntry>, ManifestError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, content_hash, indexed_at, vector_id FROM manifest",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = BTreeMap::new();
        for row in rows {
            let (path, content_hash, indexed_at, vector_id) = row?;
            let indexed_at = DateTime::parse_from_rfc3339(&indexed_at)
                .map_err(|_| ManifestError::InvalidTimestamp(path.clone()))?
                .with_timezone(&Utc);
            entries.insert(
                path.clone(),
                ManifestEntry { path, content_hash, indexed_at, vector_id },
            );
        }
        Ok(entries)
    }

    /// Insert or update one entry.
    pub fn upsert(&self, entry: &ManifestEntry) -> Result<(), ManifestError> {
        self.conn.execute(
            "INSERT INTO manifest (path, content_hash, indexed_at, vector_id)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(path) DO UPDATE SET
                content_hash = excluded.content_hash,
                indexed_at = excluded.indexed_at,
                vector_id = excluded.vector_id",
            params![
                entry.path,
                entry.content_hash,
                entry.indexed_at.to_rfc3339(),
                entry.vector_id,
            ],
        )?;
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&self, path: &str) -> Result<bool, ManifestError> {
        let rows =
            self.conn.execute("DELETE FROM manifest WHERE path = ?1", [path])?;
        Ok(rows > 0)
    }

    pub fn clear(&self) -> Result<(), ManifestError> {
        self.conn.execute("DELETE FROM manifest", [])?;
        Ok(())
    }

    pub fn len(&self) -> Result<usize, ManifestError> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM manifest", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}

fn init_schema(conn: &Connection) -> Result<(), ManifestError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        conn.execute_batch(
            r#"
            CREATE TABLE schema_version (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL
            );

            -- One row per indexed document; path is the identity.
            CREATE TABLE manifest (
                path TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                indexed_at TEXT NOT NULL,
                vector_id TEXT NOT NULL
            );
            "#,
        )?;
        conn.execute(
            "INSERT INTO schema_version (id, version) VALUES (1, ?1)",
            [SCHEMA_VERSION],
        )?;
        return Ok(());
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(ManifestError::VersionTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}
