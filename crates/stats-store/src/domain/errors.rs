//! # Domain Errors
//!
//! Error types for the Event Store.
//!
//! Every backend fault reaches the caller as a `StoreError`; nothing is
//! swallowed inside the store.

use crate::domain::entities::RecordId;
use std::fmt;

/// Errors returned by `EventStoreApi` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend read or write failed.
    Database { message: String },

    /// A record or counter could not be encoded or decoded.
    Serialization { message: String },

    /// The identity index points at a record that no longer exists.
    DanglingIndex { id: RecordId },

    /// An index key does not follow the documented layout.
    MalformedIndexKey { len: usize },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database { message } => write!(f, "Database error: {}", message),
            StoreError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            StoreError::DanglingIndex { id } => {
                write!(f, "Identity index references missing record {}", id)
            }
            StoreError::MalformedIndexKey { len } => {
                write!(f, "Malformed identity index key ({} bytes)", len)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Key-value store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    IOError { message: String },
    /// The backend is not open or has been closed.
    Closed,
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
            KVStoreError::Closed => write!(f, "KV store is closed"),
        }
    }
}

impl std::error::Error for KVStoreError {}

impl From<KVStoreError> for StoreError {
    fn from(err: KVStoreError) -> Self {
        StoreError::Database {
            message: err.to_string(),
        }
    }
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Rejected identity values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Empty or whitespace-only.
    Empty,
    /// Longer than the index key can encode.
    TooLong { len: usize, max: usize },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Empty => write!(f, "identity is empty"),
            IdentityError::TooLong { len, max } => {
                write!(f, "identity is {} bytes, max {}", len, max)
            }
        }
    }
}

impl std::error::Error for IdentityError {}
