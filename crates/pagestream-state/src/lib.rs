//! Watermark checkpoint persistence for the Pagestream engine.
//!
//! Provides the [`WatermarkStore`] trait and a [`SqliteWatermarkStore`]
//! implementation: a durable `stream key -> UTC timestamp` map with
//! strongly-consistent reads and last-write-wins upserts.

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StateError;
pub use sqlite::SqliteWatermarkStore;
pub use store::WatermarkStore;
