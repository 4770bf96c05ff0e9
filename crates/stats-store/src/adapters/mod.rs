//! # Adapters Module
//!
//! - `storage`: `KeyValueStore` implementations
//! - `infra`: clock

pub mod infra;
pub mod storage;
