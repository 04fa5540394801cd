//! SQLite-backed [`crate::EventStore`] implementation.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::AnomalyEvent;
use crate::EventStore;

/// Append-only event store backed by a single SQLite connection, guarded by
/// a mutex so it can be shared across the training/detection worker
/// threads without each host needing its own file handle.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Open (or create) the database file at `path` and ensure the schema
    /// exists.
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, used by `ad_demo` and integration tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS anomaly_events (
                detector_name    TEXT NOT NULL,
                detector_version INTEGER NOT NULL,
                host_uuid        BLOB NOT NULL,
                after_s          INTEGER NOT NULL,
                before_s         INTEGER NOT NULL,
                payload_json     TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::SchemaInit(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_anomaly_events_lookup
             ON anomaly_events (detector_name, detector_version, host_uuid, before_s)",
            [],
        )
        .map_err(|e| StoreError::SchemaInit(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl EventStore for SqliteEventStore {
    fn insert(&self, event: &AnomalyEvent) -> Result<(), StoreError> {
        let payload = event.payload_json()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO anomaly_events
                (detector_name, detector_version, host_uuid, after_s, before_s, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.detector_name,
                event.detector_version,
                event.host_uuid.as_bytes().to_vec(),
                event.after,
                event.before,
                payload,
            ],
        )?;
        Ok(())
    }

    fn range(
        &self,
        detector_name: &str,
        detector_version: i32,
        host_uuid: Uuid,
        after: i64,
        before: i64,
    ) -> Result<Vec<(i64, i64)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT after_s, before_s FROM anomaly_events
             WHERE detector_name = ?1 AND detector_version = ?2 AND host_uuid = ?3
               AND before_s >= ?4 AND after_s <= ?5
             ORDER BY after_s ASC",
        )?;
        let rows = stmt
            .query_map(
                params![detector_name, detector_version, host_uuid.as_bytes().to_vec(), after, before],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn info(
        &self,
        detector_name: &str,
        detector_version: i32,
        host_uuid: Uuid,
        after: i64,
        before: i64,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload_json FROM anomaly_events
             WHERE detector_name = ?1 AND detector_version = ?2 AND host_uuid = ?3
               AND before_s >= ?4 AND after_s <= ?5
             ORDER BY after_s ASC",
        )?;
        let rows = stmt
            .query_map(
                params![detector_name, detector_version, host_uuid.as_bytes().to_vec(), after, before],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
