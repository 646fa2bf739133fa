//! Pipeline orchestrator: the windowed extract-transform-deliver loop.
//!
//! One iteration reads the persisted watermark (or the configured initial
//! epoch), captures `Utc::now()` as the window end, drains the source's
//! batch cursor through the transform and the delivery channel, then makes
//! an explicit checkpoint decision. The outer loop repeats iterations until
//! the wall-clock budget (minus a safety margin) is spent; each iteration is
//! independently fallible and a failure never touches the watermark.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pagestream_state::{SqliteWatermarkStore, WatermarkStore};
use pagestream_types::stream::StreamKey;
use serde::Deserialize;

use crate::config::types::{ConnectorRef, PipelineConfig};
use crate::connectors::{JsonlFileSink, JsonlFileSource};
use crate::delivery::DeliveryChannel;
use crate::errors::IterationError;
use crate::sink::IngestionSink;
use crate::source::{ExtractionSource, QueryWindow};
use crate::transform;

/// What to do with the watermark once a window has been drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPolicy {
    /// Advance to the window end unconditionally, dropped records included
    /// (documented at-least-once default).
    #[default]
    Advance,
    /// Advance, but log a loud warning carrying the dropped count.
    AdvanceWithAlert,
    /// Keep the old watermark when anything was dropped, so the next
    /// iteration re-processes the window.
    Hold,
}

/// Orchestrator settings resolved from config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stream_key: StreamKey,
    /// Window lower bound before any checkpoint exists.
    pub initial_epoch: DateTime<Utc>,
    pub page_size: usize,
    pub checkpoint_policy: CheckpointPolicy,
    /// Stop starting iterations this close to the run budget's end.
    pub safety_margin: Duration,
    /// Sleep after a failed iteration.
    pub iteration_backoff: Duration,
    /// Consecutive failures before the stalled warning.
    pub stall_threshold: u32,
}

impl PipelineSettings {
    /// Defaults for everything except the stream key.
    #[must_use]
    pub fn new(stream_key: StreamKey) -> Self {
        Self {
            stream_key,
            initial_epoch: crate::config::types::ExtractionSection::default().initial_epoch,
            page_size: 100,
            checkpoint_policy: CheckpointPolicy::default(),
            safety_margin: Duration::from_secs(20),
            iteration_backoff: Duration::from_secs(5),
            stall_threshold: 5,
        }
    }
}

/// Outcome of one `run_once` iteration.
#[derive(Debug, Clone)]
pub struct IterationResult {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub batches: usize,
    pub delivered: usize,
    pub dropped: usize,
    pub watermark_advanced: bool,
}

/// Totals across one `run` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    pub iterations: u32,
    pub failures: u32,
    pub delivered: usize,
    pub dropped: usize,
}

/// A wired pipeline: source, delivery channel, watermark store, settings.
pub struct Pipeline {
    source: Arc<dyn ExtractionSource>,
    channel: DeliveryChannel,
    store: Arc<dyn WatermarkStore>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn ExtractionSource>,
        sink: Arc<dyn IngestionSink>,
        store: Arc<dyn WatermarkStore>,
        delivery: crate::delivery::DeliveryConfig,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            channel: DeliveryChannel::new(sink, delivery),
            store,
            settings,
        }
    }

    /// Wire a pipeline from a parsed configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown connector reference, a missing
    /// connector path, an unparsable byte size, or a store that cannot be
    /// opened.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let source: Arc<dyn ExtractionSource> = match config.source.use_ref.as_str() {
            "source-jsonl" => Arc::new(JsonlFileSource::new(connector_path(&config.source)?)),
            other => bail!("Unknown source connector '{other}'"),
        };
        let sink: Arc<dyn IngestionSink> = match config.sink.use_ref.as_str() {
            "sink-jsonl" => Arc::new(JsonlFileSink::new(connector_path(&config.sink)?)),
            other => bail!("Unknown sink connector '{other}'"),
        };
        let store = SqliteWatermarkStore::open(Path::new(&config.state.path))
            .with_context(|| format!("Failed to open watermark store at {}", config.state.path))?;

        let settings = PipelineSettings {
            stream_key: StreamKey::new(config.stream_key.clone()),
            initial_epoch: config.extraction.initial_epoch,
            page_size: config.extraction.page_size,
            checkpoint_policy: config.delivery.checkpoint_policy,
            safety_margin: Duration::from_secs(config.run.safety_margin_secs),
            iteration_backoff: Duration::from_secs(config.run.iteration_backoff_secs),
            stall_threshold: config.run.stall_threshold,
        };

        Ok(Self::new(
            source,
            sink,
            Arc::new(store),
            config.delivery.to_delivery_config()?,
            settings,
        ))
    }

    /// Repeat iterations until the wall-clock budget (minus the safety
    /// margin) is spent. Iteration failures are logged and absorbed here;
    /// consecutive failures back off and eventually trip a stalled warning.
    pub async fn run(&self, max_run_time: Duration) -> RunReport {
        let started = tokio::time::Instant::now();
        let budget = max_run_time.saturating_sub(self.settings.safety_margin);

        let mut report = RunReport::default();
        let mut consecutive_failures = 0u32;

        while started.elapsed() < budget {
            report.iterations += 1;
            match self.run_once().await {
                Ok(result) => {
                    consecutive_failures = 0;
                    report.delivered += result.delivered;
                    report.dropped += result.dropped;
                    tracing::info!(
                        stream = %self.settings.stream_key,
                        batches = result.batches,
                        delivered = result.delivered,
                        dropped = result.dropped,
                        watermark_advanced = result.watermark_advanced,
                        "Iteration complete"
                    );
                }
                Err(err) => {
                    report.failures += 1;
                    consecutive_failures += 1;
                    tracing::error!(
                        stream = %self.settings.stream_key,
                        error = %err,
                        consecutive = consecutive_failures,
                        "Iteration failed, watermark untouched"
                    );
                    if consecutive_failures >= self.settings.stall_threshold {
                        tracing::warn!(
                            stream = %self.settings.stream_key,
                            consecutive = consecutive_failures,
                            "Pipeline appears stalled, every recent iteration has failed"
                        );
                    }
                    tokio::time::sleep(self.settings.iteration_backoff).await;
                }
            }
        }

        report
    }

    /// One full iteration: window, extract, transform, deliver, checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an [`IterationError`] on source, store, encoding, or (in the
    /// `fail` strictness mode) delivery failure. The watermark is never
    /// advanced on the error path.
    pub async fn run_once(&self) -> Result<IterationResult, IterationError> {
        let watermark = self.read_watermark().await?;
        let window_start = watermark.unwrap_or(self.settings.initial_epoch);
        let window_end = Utc::now();
        let window = QueryWindow {
            after: window_start,
            until: window_end,
            page_size: self.settings.page_size,
        };

        tracing::info!(
            stream = %self.settings.stream_key,
            after = %window_start,
            until = %window_end,
            "Extracting window"
        );

        let mut cursor = self.source.query_window(&window).await?;
        let mut batches = 0usize;
        let mut delivered = 0usize;
        let mut dropped = 0usize;

        while let Some(batch) = cursor.next_batch().await? {
            batches += 1;
            let payloads = transform::project(&batch);
            let records = transform::encode_records(&payloads)?;
            let outcome = self.channel.deliver(records).await?;
            delivered += outcome.delivered_count();
            dropped += outcome.dropped_count();
        }

        let advance = match self.settings.checkpoint_policy {
            CheckpointPolicy::Advance => true,
            CheckpointPolicy::AdvanceWithAlert => {
                if dropped > 0 {
                    tracing::warn!(
                        stream = %self.settings.stream_key,
                        dropped,
                        until = %window_end,
                        "Advancing watermark past dropped records"
                    );
                }
                true
            }
            CheckpointPolicy::Hold => {
                if dropped > 0 {
                    tracing::warn!(
                        stream = %self.settings.stream_key,
                        dropped,
                        "Holding watermark, window will be re-processed"
                    );
                    false
                } else {
                    true
                }
            }
        };

        if advance {
            self.write_watermark(window_end).await?;
        }

        Ok(IterationResult {
            window_start,
            window_end,
            batches,
            delivered,
            dropped,
            watermark_advanced: advance,
        })
    }

    async fn read_watermark(&self) -> Result<Option<DateTime<Utc>>, IterationError> {
        let store = Arc::clone(&self.store);
        let key = self.settings.stream_key.clone();
        let value = tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| anyhow::anyhow!("watermark read task failed: {e}"))??;
        Ok(value)
    }

    async fn write_watermark(&self, value: DateTime<Utc>) -> Result<(), IterationError> {
        let store = Arc::clone(&self.store);
        let key = self.settings.stream_key.clone();
        tokio::task::spawn_blocking(move || store.set(&key, value))
            .await
            .map_err(|e| anyhow::anyhow!("watermark write task failed: {e}"))??;
        Ok(())
    }
}

fn connector_path(connector: &ConnectorRef) -> Result<PathBuf> {
    connector
        .config
        .get("path")
        .and_then(serde_yaml::Value::as_str)
        .map(PathBuf::from)
        .with_context(|| format!("Connector '{}' config requires 'path'", connector.use_ref))
}
