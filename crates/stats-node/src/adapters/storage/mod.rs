//! # Storage Adapters
//!
//! Enable the `rocksdb` feature (on by default) for the persistent backend:
//!
//! ```toml
//! stats-node = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Each database namespace gets its own column family.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

// Re-export the in-memory adapter for the memory backend and tests
pub use stats_store::InMemoryKVStore;
