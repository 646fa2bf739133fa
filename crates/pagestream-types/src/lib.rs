//! Shared Pagestream model types.
//!
//! Pure data types used across the engine, state, and CLI crates: upstream
//! interaction records, the flattened page-view payload, serialized sink
//! records, and the structured sink/source error model.

pub mod error;
pub mod record;
pub mod stream;
