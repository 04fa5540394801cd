//! Error type for the event store.

use thiserror::Error;

/// Errors raised while reading or writing anomaly events.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The underlying SQLite connection or statement failed.
    #[error("sqlite error: {source}")]
    Sqlite {
        /// Source SQLite error.
        #[from]
        source: rusqlite::Error,
    },

    /// A stored payload failed to (de)serialize as JSON.
    #[error("payload serialization error: {source}")]
    Json {
        /// Source JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The store's schema could not be initialized.
    #[error("schema initialization failed: {0}")]
    SchemaInit(String),
}
