//! SQLite-backed [`KVStore`](super::KVStore).
//!
//! One generic table backs both families; SQLite compares `BLOB` columns
//! byte-wise, so `ORDER BY key ASC` gives exactly the lexicographic order
//! spec.md §3.2/§4.1 requires without any custom collation. Grounded on
//! `src/repository/mod.rs::connect` (WAL pragmas, busy timeout) and
//! `src/repository/crawl/claim.rs` (`BEGIN IMMEDIATE` / commit-or-rollback
//! closures) in the teacher repo.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{Family, KVStore, ScanBatch};
use crate::error::StoreResult;

pub struct SqliteKvStore {
    db_path: PathBuf,
}

impl SqliteKvStore {
    /// Open (creating if absent) the store at `db_path` and ensure its schema.
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 30000;
            "#,
        )?;
        Ok(conn)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                family TEXT NOT NULL,
                key    BLOB NOT NULL,
                value  BLOB NOT NULL,
                PRIMARY KEY (family, key)
            ) WITHOUT ROWID;
            "#,
        )?;
        Ok(())
    }

    /// Flush WAL contents into the main database file and close cleanly.
    /// Called on shutdown (spec.md §6.4).
    pub fn close(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

impl KVStore for SqliteKvStore {
    fn get(&self, family: Family, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT value FROM kv WHERE family = ?1 AND key = ?2",
            params![family.as_str(), key],
            |row| row.get::<_, Vec<u8>>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, family: Family, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO kv (family, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(family, key) DO UPDATE SET value = excluded.value",
            params![family.as_str(), key, value],
        )?;
        Ok(())
    }

    fn delete(&self, family: Family, key: &[u8]) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM kv WHERE family = ?1 AND key = ?2",
            params![family.as_str(), key],
        )?;
        Ok(())
    }

    fn scan(&self, family: Family, start_key: &[u8], limit: usize) -> StoreResult<ScanBatch> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM kv WHERE family = ?1 AND key >= ?2
             ORDER BY key ASC LIMIT ?3",
        )?;
        // Fetch one extra row to know whether more remain beyond this batch.
        let rows = stmt
            .query_map(
                params![family.as_str(), start_key, (limit + 1) as i64],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let more = rows.len() > limit;
        let mut rows = rows;
        rows.truncate(limit);
        Ok(ScanBatch { rows, more })
    }

    fn delete_range(
        &self,
        family: Family,
        start_inclusive: &[u8],
        end_exclusive: Option<&[u8]>,
    ) -> StoreResult<u64> {
        let conn = self.connect()?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: StoreResult<u64> = (|| {
            let affected = match end_exclusive {
                Some(end) => conn.execute(
                    "DELETE FROM kv WHERE family = ?1 AND key >= ?2 AND key < ?3",
                    params![family.as_str(), start_inclusive, end],
                )?,
                None => conn.execute(
                    "DELETE FROM kv WHERE family = ?1 AND key >= ?2",
                    params![family.as_str(), start_inclusive],
                )?,
            };
            Ok(affected as u64)
        })();

        if result.is_ok() {
            conn.execute("COMMIT", [])?;
        } else {
            let _ = conn.execute("ROLLBACK", []);
        }
        result
    }
}
