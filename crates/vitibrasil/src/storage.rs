//! Local persistence of acquired datasets in SQLite.
//!
//! One `datasets` row per storage key plus its ordered `records`. A save
//! replaces both inside a single transaction, so readers see either the old
//! dataset or the new one, never a mix.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::address::RequestKey;
use crate::types::{TypedRecord, VitiError, VitiResult};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS datasets (
        storage_key TEXT PRIMARY KEY,
        category TEXT NOT NULL,
        sub_table TEXT,
        year INTEGER,
        rejected INTEGER NOT NULL DEFAULT 0,
        fetched_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS records (
        storage_key TEXT NOT NULL,
        position INTEGER NOT NULL,
        label TEXT NOT NULL,
        quantity INTEGER,
        value INTEGER,
        PRIMARY KEY (storage_key, position)
    );
";

/// A persisted acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDataset {
    pub key: RequestKey,
    pub records: Vec<TypedRecord>,
    /// Rows dropped by validation when this copy was fetched.
    pub rejected: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Keyed store of validated datasets.
pub trait DatasetStore: Send + Sync {
    fn has(&self, key: &RequestKey) -> VitiResult<bool>;

    /// Fails with [`VitiError::NotFound`] when nothing is stored for `key`.
    fn load(&self, key: &RequestKey) -> VitiResult<StoredDataset>;

    /// Replace whatever is stored for `key` with `records`.
    fn save(&self, key: &RequestKey, records: &[TypedRecord], rejected: usize) -> VitiResult<()>;
}

/// SQLite-backed [`DatasetStore`].
///
/// One connection behind a mutex. The lock covers single statements or one
/// save transaction and is never held across an upstream fetch, so requests
/// for different keys only queue for the duration of a local read or write.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> VitiResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VitiError::Storage(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened dataset store");
        Self::init(conn)
    }

    /// Store that lives only as long as this handle.
    pub fn open_in_memory() -> VitiResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> VitiResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Flush and close the underlying connection.
    pub fn close(self) -> VitiResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| VitiError::Storage("connection lock poisoned".into()))?;
        conn.close().map_err(|(_, e)| VitiError::Sqlite(e))
    }

    fn lock(&self) -> VitiResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VitiError::Storage("connection lock poisoned".into()))
    }
}

impl DatasetStore for SqliteStore {
    fn has(&self, key: &RequestKey) -> VitiResult<bool> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM datasets WHERE storage_key = ?1",
                params![key.storage_key()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load(&self, key: &RequestKey) -> VitiResult<StoredDataset> {
        let storage_key = key.storage_key();
        let conn = self.lock()?;

        let meta = conn
            .query_row(
                "SELECT rejected, fetched_at FROM datasets WHERE storage_key = ?1",
                params![storage_key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((rejected, fetched_at)) = meta else {
            return Err(VitiError::NotFound(storage_key));
        };
        let rejected = usize::try_from(rejected).map_err(|_| {
            VitiError::Storage(format!("bad rejected count for {storage_key}: {rejected}"))
        })?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| VitiError::Storage(format!("bad fetched_at for {storage_key}: {e}")))?
            .with_timezone(&Utc);

        let mut stmt = conn.prepare(
            "SELECT label, quantity, value FROM records
             WHERE storage_key = ?1 ORDER BY position",
        )?;
        let records = stmt
            .query_map(params![storage_key], |row| {
                Ok(TypedRecord::from_parts(
                    key.category,
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredDataset {
            key: key.clone(),
            records,
            rejected,
            fetched_at,
        })
    }

    fn save(&self, key: &RequestKey, records: &[TypedRecord], rejected: usize) -> VitiResult<()> {
        let storage_key = key.storage_key();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM records WHERE storage_key = ?1", params![storage_key])?;
        tx.execute(
            "INSERT OR REPLACE INTO datasets
                 (storage_key, category, sub_table, year, rejected, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                storage_key,
                key.category.slug(),
                key.sub_table,
                key.year,
                rejected as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO records (storage_key, position, label, quantity, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, record) in records.iter().enumerate() {
                insert.execute(params![
                    storage_key,
                    position as i64,
                    record.label(),
                    record.quantity(),
                    record.value(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(key = %storage_key, records = records.len(), "saved dataset");
        Ok(())
    }
}
