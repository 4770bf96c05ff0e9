//! Fixed-window admission control keyed by client identity.
//!
//! Each key gets a window that opens on its first request and closes
//! `window` later. Up to `max_requests` calls are admitted per window;
//! further calls are rejected without being counted, and the window is not
//! extended by rejections.

use crate::domain::config::RateLimitConfig;
use dashmap::DashMap;
use stats_store::Identity;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Bucket shared by requests with neither identity nor peer address.
pub const UNRESOLVED_KEY: &str = "unresolved";

/// Admission key for a request: the identity when resolved, otherwise the
/// raw peer address, otherwise a shared bucket.
pub fn admission_key(identity: Option<&Identity>, peer: Option<IpAddr>) -> String {
    match (identity, peer) {
        (Some(identity), _) => identity.as_str().to_string(),
        (None, Some(peer)) => format!("peer:{}", peer),
        (None, None) => UNRESOLVED_KEY.to_string(),
    }
}

/// Remaining budget of an admitted call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
}

/// Outcome of an admitted call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Counted against the key's window.
    Counted(Quota),
    /// Admission control is disabled or the key is whitelisted.
    Exempt,
}

impl Admission {
    pub fn quota(&self) -> Option<Quota> {
        match self {
            Admission::Counted(quota) => Some(*quota),
            Admission::Exempt => None,
        }
    }
}

/// Counter state for one key
#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    started: Instant,
    count: u32,
}

/// Per-key fixed-window counters shared across requests
pub struct AdmissionController {
    /// Open windows by admission key
    windows: DashMap<String, FixedWindow>,
    /// Configuration
    config: RateLimitConfig,
    /// Whitelisted keys, in admission-key form
    whitelist: HashSet<String>,
}

impl AdmissionController {
    pub fn new(config: RateLimitConfig) -> Self {
        let whitelist = config
            .whitelist
            .iter()
            .map(|ip| Identity::from_ip(*ip).as_str().to_string())
            .collect();
        Self {
            windows: DashMap::new(),
            config,
            whitelist,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and count one call for `key`.
    ///
    /// Returns the time until the window closes when the call is rejected.
    pub fn check(&self, key: &str) -> Result<Admission, Duration> {
        self.check_at(key, Instant::now())
    }

    /// `check` against an explicit clock reading.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<Admission, Duration> {
        if !self.config.enabled || self.whitelist.contains(key) {
            return Ok(Admission::Exempt);
        }

        let window = self.config.window;
        let limit = self.config.max_requests;

        // The entry guard holds the shard lock, so check-and-increment is atomic per key.
        let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| {
            debug!(key, "Opening admission window");
            FixedWindow {
                started: now,
                count: 0,
            }
        });

        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let elapsed = now.saturating_duration_since(entry.started);
            return Err(window.saturating_sub(elapsed));
        }

        entry.count += 1;
        Ok(Admission::Counted(Quota {
            limit,
            remaining: limit - entry.count,
        }))
    }

    /// Evict windows that have closed.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    pub fn cleanup_at(&self, now: Instant) {
        let window = self.config.window;
        self.windows.retain(|key, state| {
            let age = now.saturating_duration_since(state.started);
            if age >= window {
                debug!(key = %key, age_secs = age.as_secs(), "Removing expired admission window");
                false
            } else {
                true
            }
        });
    }

    /// Get number of tracked keys
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Background task to evict expired admission windows
pub async fn cleanup_task(state: Arc<AdmissionController>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        state.cleanup();
    }
}
