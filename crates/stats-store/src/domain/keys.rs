//! # Key Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `e:` | `e:{id:be64}` | bincode `EventRecord` |
//! | `i:` | `i:{len:be16}{identity}{id:be64}` | empty |
//! | `m:` | `m:next_id` | next record id, be64 |
//!
//! Index keys carry the identity length so that a prefix scan for one
//! identity never matches a longer identity sharing the same leading bytes.

use crate::domain::entities::{Identity, RecordId};
use crate::domain::errors::StoreError;

/// Key families used by the Event Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Event records: `e:{id}` -> EventRecord
    Event,
    /// Identity index: `i:{len}{identity}{id}` -> ()
    IdentityIndex,
    /// Store metadata: `m:{name}`
    Metadata,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Event => b"e:",
            KeyPrefix::IdentityIndex => b"i:",
            KeyPrefix::Metadata => b"m:",
        }
    }

    /// Build a full key with the given suffix.
    pub fn key(&self, suffix: &[u8]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        key.extend_from_slice(suffix);
        key
    }

    pub fn event_key(id: RecordId) -> Vec<u8> {
        KeyPrefix::Event.key(&id.to_be_bytes())
    }

    pub fn next_id_key() -> Vec<u8> {
        KeyPrefix::Metadata.key(b"next_id")
    }

    /// Scan prefix covering every index entry of one identity.
    pub fn identity_prefix(identity: &Identity) -> Vec<u8> {
        let bytes = identity.as_bytes();
        let mut key = Vec::with_capacity(2 + 2 + bytes.len());
        key.extend_from_slice(KeyPrefix::IdentityIndex.as_bytes());
        // Identity::new caps the length well below u16::MAX.
        key.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
        key.extend_from_slice(bytes);
        key
    }

    pub fn identity_key(identity: &Identity, id: RecordId) -> Vec<u8> {
        let mut key = Self::identity_prefix(identity);
        key.extend_from_slice(&id.to_be_bytes());
        key
    }

    /// Split an index key back into its identity bytes and record id.
    pub fn parse_identity_key(key: &[u8]) -> Result<(&[u8], RecordId), StoreError> {
        let malformed = || StoreError::MalformedIndexKey { len: key.len() };

        let rest = key
            .strip_prefix(KeyPrefix::IdentityIndex.as_bytes())
            .ok_or_else(malformed)?;
        if rest.len() < 2 {
            return Err(malformed());
        }
        let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
        let rest = &rest[2..];
        if rest.len() != len + 8 {
            return Err(malformed());
        }
        let (identity, id_bytes) = rest.split_at(len);
        let mut id = [0u8; 8];
        id.copy_from_slice(id_bytes);
        Ok((identity, RecordId::from_be_bytes(id)))
    }
}
