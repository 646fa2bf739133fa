//! Reference connectors for local runs and integration tests.

pub mod jsonl;

pub use jsonl::{JsonlFileSink, JsonlFileSource};
