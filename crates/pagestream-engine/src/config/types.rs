//! Pipeline configuration types deserialized from YAML.

use anyhow::{bail, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::delivery::{DeliveryConfig, ExhaustionPolicy};
use crate::orchestrator::CheckpointPolicy;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Config schema version; only "1.0" is accepted.
    pub version: String,
    /// Pipeline name, used in logs and summaries.
    pub pipeline: String,
    /// Watermark store key for this pipeline's checkpoint row.
    pub stream_key: String,
    pub source: ConnectorRef,
    pub sink: ConnectorRef,
    #[serde(default)]
    pub state: StateSection,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub delivery: DeliverySection,
    #[serde(default)]
    pub run: RunSection,
}

/// Reference to a connector implementation plus its opaque settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorRef {
    #[serde(rename = "use")]
    pub use_ref: String,
    #[serde(default)]
    pub config: serde_yaml::Value,
}

/// Watermark store location.
#[derive(Debug, Clone, Deserialize)]
pub struct StateSection {
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "pagestream.db".to_string()
}

/// Extraction window settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionSection {
    /// Lower bound for the very first run, before any checkpoint exists.
    #[serde(default = "default_initial_epoch")]
    pub initial_epoch: DateTime<Utc>,
    /// Records per source page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            initial_epoch: default_initial_epoch(),
            page_size: default_page_size(),
        }
    }
}

fn default_initial_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 8, 30, 0, 0, 0).unwrap()
}

fn default_page_size() -> usize {
    100
}

/// Delivery channel settings. Byte limits accept human-readable sizes
/// ("4mb", "1000kb", "512").
#[derive(Debug, Clone, Deserialize)]
pub struct DeliverySection {
    #[serde(default = "default_max_items_per_chunk")]
    pub max_items_per_chunk: usize,
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: String,
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: String,
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,
    #[serde(default = "default_request_backoff_base_secs")]
    pub request_backoff_base_secs: u32,
    #[serde(default = "default_max_item_retries")]
    pub max_item_retries: u32,
    #[serde(default = "default_item_backoff_step_secs")]
    pub item_backoff_step_secs: u64,
    #[serde(default)]
    pub on_exhaustion: ExhaustionPolicy,
    #[serde(default)]
    pub checkpoint_policy: CheckpointPolicy,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self {
            max_items_per_chunk: default_max_items_per_chunk(),
            max_chunk_bytes: default_max_chunk_bytes(),
            max_record_bytes: default_max_record_bytes(),
            max_request_retries: default_max_request_retries(),
            request_backoff_base_secs: default_request_backoff_base_secs(),
            max_item_retries: default_max_item_retries(),
            item_backoff_step_secs: default_item_backoff_step_secs(),
            on_exhaustion: ExhaustionPolicy::default(),
            checkpoint_policy: CheckpointPolicy::default(),
        }
    }
}

fn default_max_items_per_chunk() -> usize {
    500
}

fn default_max_chunk_bytes() -> String {
    "4mb".to_string()
}

fn default_max_record_bytes() -> String {
    "1000kb".to_string()
}

fn default_max_request_retries() -> u32 {
    4
}

fn default_request_backoff_base_secs() -> u32 {
    2
}

fn default_max_item_retries() -> u32 {
    10
}

fn default_item_backoff_step_secs() -> u64 {
    2
}

impl DeliverySection {
    /// Resolve the section into a [`DeliveryConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if a byte-size string cannot be parsed.
    pub fn to_delivery_config(&self) -> Result<DeliveryConfig> {
        Ok(DeliveryConfig {
            max_items_per_chunk: self.max_items_per_chunk,
            max_chunk_bytes: parse_byte_size(&self.max_chunk_bytes)?,
            max_record_bytes: parse_byte_size(&self.max_record_bytes)?,
            max_request_retries: self.max_request_retries,
            request_backoff_base_secs: self.request_backoff_base_secs,
            max_item_retries: self.max_item_retries,
            item_backoff_step_secs: self.item_backoff_step_secs,
            on_exhaustion: self.on_exhaustion,
        })
    }
}

/// Run loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Total wall-clock budget for one `run` invocation.
    #[serde(default = "default_max_run_time_secs")]
    pub max_run_time_secs: u64,
    /// Stop starting new iterations this close to the budget's end.
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,
    /// Sleep between iterations after a failed one.
    #[serde(default = "default_iteration_backoff_secs")]
    pub iteration_backoff_secs: u64,
    /// Consecutive failed iterations before a stall warning is logged.
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            max_run_time_secs: default_max_run_time_secs(),
            safety_margin_secs: default_safety_margin_secs(),
            iteration_backoff_secs: default_iteration_backoff_secs(),
            stall_threshold: default_stall_threshold(),
        }
    }
}

fn default_max_run_time_secs() -> u64 {
    840
}

fn default_safety_margin_secs() -> u64 {
    20
}

fn default_iteration_backoff_secs() -> u64 {
    5
}

fn default_stall_threshold() -> u32 {
    5
}

/// Parse a human-readable byte size: a bare number, or a number with a
/// `b`/`kb`/`mb`/`gb` suffix (case-insensitive).
///
/// # Errors
///
/// Returns an error for empty input, an unknown suffix, or a non-numeric
/// value.
pub fn parse_byte_size(input: &str) -> Result<usize> {
    let trimmed = input.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        bail!("Empty byte size");
    }

    let (number, multiplier) = if let Some(n) = trimmed.strip_suffix("kb") {
        (n, 1024usize)
    } else if let Some(n) = trimmed.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = trimmed.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = trimmed.strip_suffix('b') {
        (n, 1)
    } else {
        (trimmed.as_str(), 1)
    };

    let value: usize = number
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid byte size '{input}'"))?;
    Ok(value * multiplier)
}
