//! # Node Configuration
//!
//! `StatsConfig` assembled from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. The JSON file named by `STATS_CONFIG`
//! 3. Individual environment variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `STATS_HOST` | `http.host` |
//! | `STATS_PORT` or `PORT` | `http.port` |
//! | `STATS_DATA_DIR` | `store.data_dir` |
//! | `STATS_DATABASE` | `store.database` |
//! | `STATS_STORE_BACKEND` | `store.backend` (`rocksdb` or `memory`) |
//! | `STATS_RATE_LIMIT_MAX` | `rate_limit.max_requests` |
//! | `STATS_RATE_LIMIT_WINDOW_SECS` | `rate_limit.window` |
//! | `STATS_TRUST_FORWARDED` | `security.trust_forwarded_headers` |

use anyhow::{Context, Result};
use stats_gateway::{StatsConfig, StoreBackend};
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "STATS_CONFIG";

/// Load and validate configuration, reading variables through `lookup`.
pub fn load_config<F>(lookup: F) -> Result<StatsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_VAR) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            let config: StatsConfig = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse config file {}", path))?;
            info!(path = %path, "Loaded configuration file");
            config
        }
        None => StatsConfig::default(),
    };

    apply_env_overrides(&mut config, &lookup)?;

    config
        .validate()
        .context("Invalid configuration")?;

    Ok(config)
}

/// Apply the individual environment overrides on top of `config`.
pub fn apply_env_overrides<F>(config: &mut StatsConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = parse_var::<IpAddr, _>(lookup, "STATS_HOST")? {
        config.http.host = host;
    }
    if let Some(port) = parse_var::<u16, _>(lookup, "STATS_PORT")? {
        config.http.port = port;
    } else if let Some(port) = parse_var::<u16, _>(lookup, "PORT")? {
        config.http.port = port;
    }

    if let Some(dir) = lookup("STATS_DATA_DIR") {
        config.store.data_dir = PathBuf::from(dir);
    }
    if let Some(database) = lookup("STATS_DATABASE") {
        config.store.database = database;
    }
    if let Some(backend) = parse_var::<StoreBackend, _>(lookup, "STATS_STORE_BACKEND")? {
        config.store.backend = backend;
    }

    if let Some(max) = parse_var::<u32, _>(lookup, "STATS_RATE_LIMIT_MAX")? {
        config.rate_limit.max_requests = max;
    }
    if let Some(secs) = parse_var::<u64, _>(lookup, "STATS_RATE_LIMIT_WINDOW_SECS")? {
        config.rate_limit.window = Duration::from_secs(secs);
    }

    if let Some(trust) = parse_var::<bool, _>(lookup, "STATS_TRUST_FORWARDED")? {
        config.security.trust_forwarded_headers = trust;
    }

    Ok(())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}={:?}: {}", key, raw, e)),
        None => Ok(None),
    }
}
