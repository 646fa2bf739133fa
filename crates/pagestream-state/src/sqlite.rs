//! `SQLite`-backed implementation of [`WatermarkStore`].
//!
//! Uses a single `Mutex<Connection>` for thread safety. Watermarks are
//! stored as RFC 3339 UTC strings, which sort lexicographically in
//! timestamp order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use pagestream_types::stream::StreamKey;
use rusqlite::Connection;

use crate::error::{self, StateError};
use crate::store::WatermarkStore;

/// Idempotent DDL for the checkpoint table.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS checkpoints (
    stream_key TEXT PRIMARY KEY,
    watermark TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

/// `SQLite`-backed watermark storage.
///
/// Create with [`SqliteWatermarkStore::open`] for file-backed persistence
/// or [`SqliteWatermarkStore::in_memory`] for tests.
pub struct SqliteWatermarkStore {
    conn: Mutex<Connection>,
}

impl SqliteWatermarkStore {
    /// Open or create a `SQLite` checkpoint database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created, or
    /// [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory checkpoint store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't be
    /// initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }
}

impl WatermarkStore for SqliteWatermarkStore {
    fn get(&self, stream: &StreamKey) -> error::Result<Option<DateTime<Utc>>> {
        let conn = self.lock_conn()?;
        let result = conn.query_row(
            "SELECT watermark FROM checkpoints WHERE stream_key = ?1",
            [stream.as_str()],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(raw) => {
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| {
                    StateError::CorruptWatermark {
                        stream: stream.as_str().to_string(),
                        value: raw,
                    }
                })?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StateError::Sqlite(e)),
        }
    }

    fn set(&self, stream: &StreamKey, watermark: DateTime<Utc>) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO checkpoints (stream_key, watermark, updated_at) \
             VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT(stream_key) \
             DO UPDATE SET watermark = ?2, updated_at = datetime('now')",
            rusqlite::params![stream.as_str(), watermark.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(name: &str) -> StreamKey {
        StreamKey::new(name)
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn get_on_never_written_key_is_none() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        assert!(store.get(&key("s")).unwrap().is_none());
    }

    #[test]
    fn watermark_roundtrip() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let t = ts("2026-08-01T10:00:00Z");
        store.set(&key("s"), t).unwrap();
        assert_eq!(store.get(&key("s")).unwrap(), Some(t));
    }

    #[test]
    fn upsert_overwrites_with_latest() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let t1 = ts("2026-08-01T10:00:00Z");
        let t2 = ts("2026-08-01T11:00:00Z");
        store.set(&key("s"), t1).unwrap();
        store.set(&key("s"), t2).unwrap();
        assert_eq!(store.get(&key("s")).unwrap(), Some(t2));
    }

    #[test]
    fn different_streams_independent() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let ta = ts("2026-08-01T10:00:00Z");
        let tb = ts("2026-08-02T10:00:00Z");
        store.set(&key("a"), ta).unwrap();
        store.set(&key("b"), tb).unwrap();
        assert_eq!(store.get(&key("a")).unwrap(), Some(ta));
        assert_eq!(store.get(&key("b")).unwrap(), Some(tb));
    }

    #[test]
    fn subsecond_precision_survives() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        let t = Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap()
            + chrono::Duration::milliseconds(123);
        store.set(&key("s"), t).unwrap();
        assert_eq!(store.get(&key("s")).unwrap(), Some(t));
    }

    #[test]
    fn corrupt_watermark_reported() {
        let store = SqliteWatermarkStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO checkpoints (stream_key, watermark) VALUES ('bad', 'garbage')",
                [],
            )
            .unwrap();
        }
        let err = store.get(&key("bad")).unwrap_err();
        assert!(matches!(err, StateError::CorruptWatermark { .. }));
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/checkpoints.db");
        let t = ts("2026-08-01T10:00:00Z");
        {
            let store = SqliteWatermarkStore::open(&path).unwrap();
            store.set(&key("s"), t).unwrap();
        }
        let store = SqliteWatermarkStore::open(&path).unwrap();
        assert_eq!(store.get(&key("s")).unwrap(), Some(t));
    }
}
