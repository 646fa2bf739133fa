//! Engine error model and retry backoff policy helpers.

use std::time::Duration;

use pagestream_state::StateError;
use pagestream_types::error::{SinkError, SourceError};

/// Upper bound on any single backoff sleep, so a misconfigured base or
/// retry bound cannot park an iteration for minutes.
const BACKOFF_MAX_SECS: u64 = 300;

/// Request-level backoff: `base^attempt` seconds (exponential), for
/// whole-chunk resubmission after a transient service error.
///
/// With the default base of 2 the schedule is 2, 4, 8, 16 seconds for
/// attempts 1 through 4.
#[must_use]
pub fn request_backoff(base_secs: u32, attempt: u32) -> Duration {
    let secs = u64::from(base_secs).saturating_pow(attempt);
    Duration::from_secs(secs.min(BACKOFF_MAX_SECS))
}

/// Item-level backoff: `counter * step` seconds (linear), for resubmission
/// of the failed subset of a chunk.
///
/// Deliberately gentler than the exponential request-level policy: per-item
/// failures are assumed to be lower-rate, recoverable conditions such as
/// momentary per-shard throttling.
#[must_use]
pub fn item_backoff(step_secs: u64, counter: u32) -> Duration {
    let secs = step_secs.saturating_mul(u64::from(counter));
    Duration::from_secs(secs.min(BACKOFF_MAX_SECS))
}

// ---------------------------------------------------------------------------
// DeliveryError — raised only in the `fail` strictness mode
// ---------------------------------------------------------------------------

/// Terminal delivery failure.
///
/// Under the default `swallow` strictness these conditions are logged and
/// absorbed into the [`DeliveryOutcome`](crate::DeliveryOutcome) as dropped
/// records; under `fail` they are returned to the caller and abort the
/// iteration.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transient whole-request failures exhausted the request-level bound.
    #[error("request retries exhausted after {attempts} resubmissions, {records} records abandoned: {source}")]
    RequestRetriesExhausted {
        attempts: u32,
        records: usize,
        source: SinkError,
    },

    /// The sink rejected the request with a permanent client-side error.
    #[error("non-retryable sink error, {records} records abandoned: {source}")]
    NonRetryable { records: usize, source: SinkError },

    /// Per-item failures exhausted the item-level bound.
    #[error("item retries exhausted after {attempts} resubmissions, {records} records dropped")]
    ItemRetriesExhausted { attempts: u32, records: usize },

    /// The sink violated its contract: response entry count does not match
    /// the submitted record count.
    #[error("sink response had {got} entries for {expected} submitted records")]
    ResponseShape { expected: usize, got: usize },
}

// ---------------------------------------------------------------------------
// IterationError — caught at the iteration boundary by the run loop
// ---------------------------------------------------------------------------

/// Failure of one orchestrator iteration.
///
/// The run loop logs these and continues; the watermark for the failed
/// iteration is never advanced.
#[derive(Debug, thiserror::Error)]
pub enum IterationError {
    /// Windowed query or batch fetch failed.
    #[error("extraction failed: {0}")]
    Source(#[from] SourceError),

    /// Watermark read or write failed.
    #[error("watermark store failed: {0}")]
    State(#[from] StateError),

    /// Delivery failed under the `fail` strictness mode.
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    /// A payload could not be serialized.
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Host-side failure (blocking task panicked, etc.).
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}
