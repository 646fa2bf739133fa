//! Extraction source contract.
//!
//! The source exposes a time-windowed query yielding a lazy, size-bounded
//! paged sequence of interaction records. The returned cursor is
//! single-pass; a fresh `query_window` call re-issues the query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagestream_types::error::SourceError;
use pagestream_types::record::InteractionRecord;

/// Half-open extraction window `(after, until]` over record event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    /// Exclusive lower bound (the persisted watermark, or the configured
    /// initial epoch on first run).
    pub after: DateTime<Utc>,
    /// Inclusive upper bound, captured at the start of the iteration.
    pub until: DateTime<Utc>,
    /// Maximum records per returned batch.
    pub page_size: usize,
}

impl QueryWindow {
    /// Does `event_time` fall inside this window?
    #[must_use]
    pub fn contains(&self, event_time: DateTime<Utc>) -> bool {
        event_time > self.after && event_time <= self.until
    }
}

/// Single-pass batch sequence returned by one windowed query.
#[async_trait]
pub trait BatchCursor: Send {
    /// Fetch the next batch, or `None` once the sequence is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<InteractionRecord>>, SourceError>;
}

impl std::fmt::Debug for dyn BatchCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BatchCursor")
    }
}

/// Upstream system providing time-windowed interaction records.
#[async_trait]
pub trait ExtractionSource: Send + Sync {
    /// Issue a windowed query and return a fresh cursor over its batches.
    async fn query_window(
        &self,
        window: &QueryWindow,
    ) -> Result<Box<dyn BatchCursor>, SourceError>;
}
