//! Watermark store trait definition.

use chrono::{DateTime, Utc};
use pagestream_types::stream::StreamKey;

use crate::error;

/// Durable `stream key -> watermark timestamp` storage.
///
/// The watermark marks the exclusive lower bound of the next extraction
/// window. Callers are assumed single-writer per key: `set` is an
/// unconditional last-write-wins upsert with no compare-and-swap.
///
/// Implementations must be `Send + Sync` for use behind
/// `Arc<dyn WatermarkStore>`.
pub trait WatermarkStore: Send + Sync {
    /// Read the current watermark for a stream.
    ///
    /// Returns `Ok(None)` when no checkpoint has ever been written for the
    /// key. Reads are strongly consistent: a successful `set` is visible to
    /// every subsequent `get`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn get(&self, stream: &StreamKey) -> error::Result<Option<DateTime<Utc>>>;

    /// Upsert the watermark for a stream.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::StateError) on storage failure.
    fn set(&self, stream: &StreamKey, watermark: DateTime<Utc>) -> error::Result<()>;
}
