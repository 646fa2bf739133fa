//! Core extract-transform-deliver engine for Pagestream.
//!
//! The orchestrator drives repeated iterations within a wall-clock budget:
//! read the watermark, query the extraction source for the window, flatten
//! interactions into page-view payloads, push them through the delivery
//! channel in bounded chunks, and advance the checkpoint.

pub mod chunker;
pub mod config;
pub mod connectors;
pub mod delivery;
pub mod errors;
pub mod orchestrator;
pub mod sink;
pub mod source;
pub mod transform;

// Re-export public API for convenience
pub use delivery::{DeliveryChannel, DeliveryConfig, DeliveryOutcome, DropReason, ExhaustionPolicy};
pub use errors::{DeliveryError, IterationError};
pub use orchestrator::{CheckpointPolicy, IterationResult, Pipeline, PipelineSettings, RunReport};
