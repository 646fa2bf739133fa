//! Batched delivery channel with two-level retry.
//!
//! One `deliver` call takes a flat batch of sink records, plans bounded
//! chunks, and submits them strictly sequentially. Per chunk, a fresh
//! [`DeliveryAttempt`] accumulator drives the retry protocol:
//!
//! - whole-request transient failures back off exponentially and resubmit
//!   the entire pending set, bounded by `max_request_retries`;
//! - per-item failures back off linearly and resubmit only the failed
//!   subset (original relative order preserved), bounded by
//!   `max_item_retries`.
//!
//! Under the default `swallow` strictness both exhaustion cases are logged
//! and recorded as drops in the returned [`DeliveryOutcome`]; the `fail`
//! mode turns them into a [`DeliveryError`] instead.

use std::sync::Arc;

use pagestream_types::error::SinkError;
use pagestream_types::record::SinkRecord;
use serde::Deserialize;

use crate::chunker;
use crate::errors::{item_backoff, request_backoff, DeliveryError};
use crate::sink::IngestionSink;

/// What to do when a retry bound is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Log, record the drop, and keep going (documented default).
    #[default]
    Swallow,
    /// Return a [`DeliveryError`] and abort the iteration.
    Fail,
}

/// Delivery channel tuning knobs.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Sink limit: records per request.
    pub max_items_per_chunk: usize,
    /// Sink limit: total serialized bytes per request.
    pub max_chunk_bytes: usize,
    /// Sink limit: serialized bytes per individual record.
    pub max_record_bytes: usize,
    /// Whole-chunk resubmissions after a transient service error.
    pub max_request_retries: u32,
    /// Base of the exponential request-level backoff (`base^attempt` secs).
    pub request_backoff_base_secs: u32,
    /// Resubmissions of the failed subset of a chunk.
    pub max_item_retries: u32,
    /// Step of the linear item-level backoff (`counter * step` secs).
    pub item_backoff_step_secs: u64,
    pub on_exhaustion: ExhaustionPolicy,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_items_per_chunk: 500,
            max_chunk_bytes: 4 * 1024 * 1024,
            max_record_bytes: 1000 * 1024,
            max_request_retries: 4,
            request_backoff_base_secs: 2,
            max_item_retries: 10,
            item_backoff_step_secs: 2,
            on_exhaustion: ExhaustionPolicy::Swallow,
        }
    }
}

/// Why a record was permanently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Serialized record exceeds the per-record sink limit; never submitted.
    OversizedRecord,
    /// Whole-request transient failures exhausted the request-level bound.
    RequestRetriesExhausted,
    /// The sink rejected the request with a permanent client-side error.
    NonRetryableRequest,
    /// Per-item failures exhausted the item-level bound.
    ItemRetriesExhausted,
}

/// Final state of one input record after `deliver` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Not yet resolved; never observable after `deliver` returns.
    Pending,
    Delivered,
    Dropped(DropReason),
}

/// Per-record outcome of one `deliver` call, indexed by original input
/// position.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    statuses: Vec<RecordStatus>,
}

impl DeliveryOutcome {
    /// Status of every input record, in input order.
    #[must_use]
    pub fn statuses(&self) -> &[RecordStatus] {
        &self.statuses
    }

    #[must_use]
    pub fn delivered_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| matches!(s, RecordStatus::Delivered))
            .count()
    }

    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped().count()
    }

    /// Dropped records as `(original index, reason)` pairs.
    pub fn dropped(&self) -> impl Iterator<Item = (usize, DropReason)> + '_ {
        self.statuses.iter().enumerate().filter_map(|(i, s)| {
            if let RecordStatus::Dropped(reason) = s {
                Some((i, *reason))
            } else {
                None
            }
        })
    }

    #[must_use]
    pub fn is_fully_delivered(&self) -> bool {
        self.statuses
            .iter()
            .all(|s| matches!(s, RecordStatus::Delivered))
    }
}

/// Transient per-chunk retry accumulator.
///
/// Scoped to one chunk and dropped once the chunk is judged fully handled,
/// so counters cannot leak between unrelated deliveries.
#[derive(Debug, Default)]
struct DeliveryAttempt {
    request_retries: u32,
    item_retries: u32,
}

/// Submits chunks to the sink and drives the two-level retry protocol.
pub struct DeliveryChannel {
    sink: Arc<dyn IngestionSink>,
    config: DeliveryConfig,
}

impl DeliveryChannel {
    #[must_use]
    pub fn new(sink: Arc<dyn IngestionSink>, config: DeliveryConfig) -> Self {
        Self { sink, config }
    }

    /// Deliver a flat batch of records, chunk by chunk, sequentially.
    ///
    /// Always resolves every input index to `Delivered` or `Dropped` under
    /// the `swallow` policy.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] only under the `fail` strictness mode.
    pub async fn deliver(
        &self,
        records: Vec<SinkRecord>,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let mut statuses = vec![RecordStatus::Pending; records.len()];

        // Pre-flight: flag records the sink would reject outright.
        let mut survivors: Vec<usize> = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if record.len() > self.config.max_record_bytes {
                tracing::warn!(
                    index = i,
                    bytes = record.len(),
                    limit = self.config.max_record_bytes,
                    "Dropping oversized record before submission"
                );
                statuses[i] = RecordStatus::Dropped(DropReason::OversizedRecord);
            } else {
                survivors.push(i);
            }
        }

        let chunks: Vec<Vec<usize>> = chunker::plan_chunks(
            &survivors,
            self.config.max_items_per_chunk,
            self.config.max_chunk_bytes,
            |&i| records[i].len(),
        )
        .into_iter()
        .map(<[usize]>::to_vec)
        .collect();

        for chunk in chunks {
            tracing::info!(records = chunk.len(), "Putting chunk into the sink");
            self.attempt_deliver(&records, chunk, &mut statuses).await?;
        }

        Ok(DeliveryOutcome { statuses })
    }

    /// Drive one chunk to resolution: submit, classify, retry, and flip
    /// each pending index to its terminal status.
    async fn attempt_deliver(
        &self,
        records: &[SinkRecord],
        mut pending: Vec<usize>,
        statuses: &mut [RecordStatus],
    ) -> Result<(), DeliveryError> {
        let mut attempt = DeliveryAttempt::default();

        loop {
            let batch: Vec<SinkRecord> = pending.iter().map(|&i| records[i].clone()).collect();

            let response = match self.sink.put_record_batch(&batch).await {
                Ok(response) => response,
                Err(err) if err.is_transient() => {
                    if attempt.request_retries < self.config.max_request_retries {
                        attempt.request_retries += 1;
                        let delay = request_backoff(
                            self.config.request_backoff_base_secs,
                            attempt.request_retries,
                        );
                        tracing::warn!(
                            error = %err,
                            attempt = attempt.request_retries,
                            max_retries = self.config.max_request_retries,
                            delay_secs = delay.as_secs(),
                            "Transient sink error, backing off and resubmitting chunk"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::error!(
                        error = %err,
                        records = pending.len(),
                        "Request retries exhausted, abandoning chunk"
                    );
                    for &i in &pending {
                        statuses[i] = RecordStatus::Dropped(DropReason::RequestRetriesExhausted);
                    }
                    if self.config.on_exhaustion == ExhaustionPolicy::Fail {
                        return Err(DeliveryError::RequestRetriesExhausted {
                            attempts: attempt.request_retries,
                            records: pending.len(),
                            source: err,
                        });
                    }
                    return Ok(());
                }
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        records = pending.len(),
                        "Non-retryable sink error, abandoning chunk"
                    );
                    for &i in &pending {
                        statuses[i] = RecordStatus::Dropped(DropReason::NonRetryableRequest);
                    }
                    if self.config.on_exhaustion == ExhaustionPolicy::Fail {
                        return Err(DeliveryError::NonRetryable {
                            records: pending.len(),
                            source: err,
                        });
                    }
                    return Ok(());
                }
            };

            if response.entries.len() != pending.len() {
                tracing::error!(
                    expected = pending.len(),
                    got = response.entries.len(),
                    "Sink response entry count does not match submission, abandoning chunk"
                );
                for &i in &pending {
                    statuses[i] = RecordStatus::Dropped(DropReason::NonRetryableRequest);
                }
                if self.config.on_exhaustion == ExhaustionPolicy::Fail {
                    return Err(DeliveryError::ResponseShape {
                        expected: pending.len(),
                        got: response.entries.len(),
                    });
                }
                return Ok(());
            }

            // Extract the failed subset, preserving original relative order.
            let mut failed = Vec::new();
            for (pos, &i) in pending.iter().enumerate() {
                if response.entries[pos].is_failure() {
                    failed.push(i);
                } else {
                    statuses[i] = RecordStatus::Delivered;
                }
            }

            if failed.is_empty() {
                return Ok(());
            }

            if attempt.item_retries < self.config.max_item_retries {
                attempt.item_retries += 1;
                let delay =
                    item_backoff(self.config.item_backoff_step_secs, attempt.item_retries);
                tracing::warn!(
                    failed = failed.len(),
                    retry = attempt.item_retries,
                    max_retries = self.config.max_item_retries,
                    delay_secs = delay.as_secs(),
                    "Partial failure, retrying failed records only"
                );
                tokio::time::sleep(delay).await;
                pending = failed;
                continue;
            }

            for &i in &failed {
                tracing::error!(
                    record = %String::from_utf8_lossy(records[i].as_bytes()).trim_end(),
                    "Not able to put record, dropping after item retries exhausted"
                );
                statuses[i] = RecordStatus::Dropped(DropReason::ItemRetriesExhausted);
            }
            if self.config.on_exhaustion == ExhaustionPolicy::Fail {
                return Err(DeliveryError::ItemRetriesExhausted {
                    attempts: attempt.item_retries,
                    records: failed.len(),
                });
            }
            return Ok(());
        }
    }
}
