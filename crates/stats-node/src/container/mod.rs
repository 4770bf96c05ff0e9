//! # Node Container
//!
//! Configuration loading and the Event Store connector.

pub mod config;
pub mod connector;

pub use config::{apply_env_overrides, load_config, CONFIG_PATH_VAR};
pub use connector::{connect_with_retry, open_store, ConnectError};
