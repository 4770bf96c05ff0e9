//! Middleware stack for the statistics gateway.
//!
//! Layer order: Request → CORS → Tracing → [ /statistics: StoreAvailability ] → Handler
//!
//! Identity resolution and admission control run inside the Statistics
//! Service rather than as layers, so that availability is always checked
//! first and identity failures are reported after admission is charged.

pub mod availability;
pub mod cors;
pub mod identity;
pub mod metrics;
pub mod rate_limit;
pub mod tracing;

pub use availability::StoreAvailabilityLayer;
pub use cors::create_cors_layer;
pub use identity::{IdentityResolver, RequestOrigin, TrustedProxyConfig};
pub use metrics::{Operation, RequestTimer, StatsMetrics};
pub use rate_limit::{admission_key, Admission, AdmissionController, Quota};
pub use self::tracing::TracingLayer;
