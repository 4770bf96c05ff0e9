//! # Event Store (stats-store)
//!
//! The persistence layer for the IP statistics service. It records one
//! `EventRecord` per logged request and answers identity-scoped aggregates.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Immutable Timestamp | A record's timestamp is written once at insert |
//! | 2 | One-way Erasure | An anonymized identity is never restored |
//! | 3 | Atomic Mutations | Insert, anonymize and delete commit one batch each |
//! | 4 | Non-empty Identity | `Identity` cannot be constructed empty |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, key layout and errors
//! - `ports/` - `EventStoreApi` (inbound) and `KeyValueStore`/`TimeSource` (outbound)
//! - `adapters/` - In-memory key-value store and system clock
//! - `service/` - `EventStoreService`, the application service over a `KeyValueStore`
//!
//! ## Usage
//!
//! ```ignore
//! use stats_store::{EventStoreApi, EventStoreService, Identity};
//!
//! let mut store = EventStoreService::new_in_memory();
//! let identity = Identity::new("10.0.0.1")?;
//!
//! store.insert(&identity)?;
//! assert_eq!(store.count_by_identity(&identity)?, 1);
//!
//! store.anonymize(&identity)?;
//! assert_eq!(store.count_by_identity(&identity)?, 0);
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::infra::{FixedTimeSource, SystemTimeSource};
pub use adapters::storage::InMemoryKVStore;
pub use domain::entities::{EventRecord, Identity, RecordId, Timestamp};
pub use domain::errors::{IdentityError, KVStoreError, StoreError};
pub use domain::keys::KeyPrefix;
pub use ports::inbound::EventStoreApi;
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult, TimeSource};
pub use service::EventStoreService;
