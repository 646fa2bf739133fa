//! Ingestion sink contract.
//!
//! The sink accepts one chunk per request and reports, per submitted record
//! (by position), success or an error code. Whole-request failures use the
//! [`SinkError`] surface instead and are classified transient/permanent by
//! the delivery channel.

use async_trait::async_trait;
use pagestream_types::error::SinkError;
use pagestream_types::record::SinkRecord;

/// Per-record outcome inside an accepted batch response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordResult {
    /// Sink-assigned error code; `None` means the record was accepted.
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl RecordResult {
    /// An accepted record.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// A rejected record with a sink error code.
    #[must_use]
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

/// Response to one batch-submit request: one entry per submitted record,
/// in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub entries: Vec<RecordResult>,
}

impl BatchResponse {
    /// All-success response for `count` records.
    #[must_use]
    pub fn all_ok(count: usize) -> Self {
        Self {
            entries: vec![RecordResult::ok(); count],
        }
    }

    /// Number of per-record failures in this response.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_failure()).count()
    }
}

/// Append-only batch ingestion endpoint.
///
/// External limits the delivery channel enforces pre-flight: at most 500
/// records per request, 1,000 KB per record, 4 MB per request.
#[async_trait]
pub trait IngestionSink: Send + Sync {
    /// Submit one chunk. An `Ok` response may still carry per-item
    /// failures; an `Err` means the whole request failed.
    async fn put_record_batch(&self, records: &[SinkRecord]) -> Result<BatchResponse, SinkError>;
}
