//! # Domain Layer
//!
//! Pure domain logic for the Event Store. No I/O lives here.
//!
//! ## Modules
//!
//! - `entities` - `EventRecord`, `Identity` and the id/timestamp aliases
//! - `keys` - Key layout of records and the identity index
//! - `errors` - Domain error types

pub mod entities;
pub mod errors;
pub mod keys;
