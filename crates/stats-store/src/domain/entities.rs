//! # Domain Entities
//!
//! Core entities of the Event Store.

use crate::domain::errors::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Store-assigned record identifier, monotonically increasing.
pub type RecordId = u64;

/// Upper bound on identity length; the index key encodes it as a `u16`.
pub const MAX_IDENTITY_LEN: usize = 1024;

/// The resolved client identity (an IP address in canonical text form).
///
/// Construction rejects empty and oversized values, so every stored or
/// enumerated identity is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create an identity from a raw string. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdentityError::Empty);
        }
        if trimmed.len() > MAX_IDENTITY_LEN {
            return Err(IdentityError::TooLong {
                len: trimmed.len(),
                max: MAX_IDENTITY_LEN,
            });
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Identity of an IP address. IPv4-mapped IPv6 addresses collapse to IPv4.
    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_canonical().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl From<IpAddr> for Identity {
    fn from(ip: IpAddr) -> Self {
        Self::from_ip(ip)
    }
}

/// One logged request.
///
/// `identity` is `None` once the record has been anonymized. `timestamp`
/// has no setter: it is fixed when the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    id: RecordId,
    identity: Option<Identity>,
    timestamp: Timestamp,
}

impl EventRecord {
    pub fn new(id: RecordId, identity: Identity, timestamp: Timestamp) -> Self {
        Self {
            id,
            identity: Some(identity),
            timestamp,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn is_anonymized(&self) -> bool {
        self.identity.is_none()
    }

    /// Erase the identity. Returns `false` if it was already erased.
    pub fn anonymize(&mut self) -> bool {
        self.identity.take().is_some()
    }
}
