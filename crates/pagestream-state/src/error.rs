//! Watermark store error types.

/// Errors produced by [`WatermarkStore`](crate::WatermarkStore) operations.
///
/// Store failures are never retried internally; they surface as a failure
/// of the enclosing pipeline iteration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Underlying `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File-system I/O failure (e.g. creating the database directory).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored watermark could not be parsed as an RFC 3339 timestamp.
    #[error("corrupt watermark for stream '{stream}': {value}")]
    CorruptWatermark { stream: String, value: String },

    /// Internal mutex was poisoned by a panicked thread.
    #[error("watermark store lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StateError>;
