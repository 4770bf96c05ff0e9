#![allow(missing_docs)]

//! Stats Gateway - HTTP boundary of the IP statistics service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    STATS GATEWAY (port 4000)                  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  CORS → Tracing → /statistics: StoreAvailability → handlers  │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 Statistics Service                     │  │
//! │  │  resolve identity → admit (fixed window) → store call  │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              │ StatsStore (async port)       │
//! │  ┌───────────────────────────┴────────────────────────────┐  │
//! │  │     StoreHandle → BlockingStoreAdapter (spawn_blocking)│  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! └──────────────────────────────┼───────────────────────────────┘
//!                                ▼
//!                   stats-store (EventStoreApi)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use stats_gateway::{StatsConfig, StatsGatewayService, StoreHandle};
//!
//! let store = StoreHandle::disconnected();
//! let service = StatsGatewayService::new(StatsConfig::default(), store.clone())?;
//! service.start(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod middleware;
pub mod ports;
pub mod router;
pub mod service;
pub mod statistics;

pub use adapters::{BlockingStoreAdapter, StoreHandle};
pub use domain::config::{
    ConfigError, CorsConfig, HttpConfig, RateLimitConfig, SecurityConfig, StatsConfig,
    StoreBackend, StoreConfig,
};
pub use domain::error::{ErrorBody, GatewayError, StatsError, StatsResult};
pub use middleware::{
    AdmissionController, IdentityResolver, RequestOrigin, StatsMetrics, TrustedProxyConfig,
};
pub use ports::outbound::StatsStore;
pub use router::{build_router, AppState, CountResponse, HealthResponse};
pub use service::StatsGatewayService;
pub use statistics::{Admitted, StatisticsService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
