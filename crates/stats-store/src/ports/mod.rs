//! # Ports Layer
//!
//! - `inbound.rs` - Driving port (`EventStoreApi`, used by the gateway)
//! - `outbound.rs` - Driven ports (`KeyValueStore`, `TimeSource`)

pub mod inbound;
pub mod outbound;
