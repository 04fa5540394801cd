//! AD1 Event Store
//!
//! Append-only persistence for closed anomaly events (`AnomalyEvent`). The
//! host agent's own time-series storage is out of scope here (see
//! `ad_common::storage`); this crate only owns the detector's own small
//! side table of anomaly-event rows.
//!
//! # Module Structure
//!
//! - [`event`] - `AnomalyEvent` / `DimensionContribution`
//! - [`error`] - `StoreError`
//! - [`sqlite`] - `SqliteEventStore`, the SQL-backed implementation

pub mod error;
pub mod event;
pub mod sqlite;

pub use crate::error::StoreError;
pub use crate::event::{AnomalyEvent, DimensionContribution};
pub use crate::sqlite::SqliteEventStore;

use uuid::Uuid;

/// Append-only store of closed anomaly events, queryable by detector
/// identity, host, and time range.
pub trait EventStore: Send + Sync {
    /// Append a newly-closed event.
    fn insert(&self, event: &AnomalyEvent) -> Result<(), StoreError>;

    /// `[after, before]` pairs of every event overlapping the given range.
    fn range(
        &self,
        detector_name: &str,
        detector_version: i32,
        host_uuid: Uuid,
        after: i64,
        before: i64,
    ) -> Result<Vec<(i64, i64)>, StoreError>;

    /// Raw `payload_json` of every event overlapping the given range, in
    /// the same order as [`EventStore::range`].
    fn info(
        &self,
        detector_name: &str,
        detector_version: i32,
        host_uuid: Uuid,
        after: i64,
        before: i64,
    ) -> Result<Vec<String>, StoreError>;
}
