//! Domain types for the statistics gateway.

pub mod config;
pub mod error;
