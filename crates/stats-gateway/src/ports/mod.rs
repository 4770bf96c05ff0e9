//! Ports for the statistics gateway.
//!
//! - `outbound.rs` - the async store port the Statistics Service drives

pub mod outbound;
