//! Request and operation counters, served as JSON at `/metrics`.

use crate::domain::error::StatsError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Statistics operations, for per-operation counters and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Count,
    DistinctCount,
    Record,
    Anonymize,
    Erase,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Count => "count",
            Operation::DistinctCount => "distinct_count",
            Operation::Record => "record",
            Operation::Anonymize => "anonymize",
            Operation::Erase => "erase",
        }
    }

    /// Whether the operation is scoped to the caller's identity.
    pub fn requires_identity(&self) -> bool {
        !matches!(self, Operation::DistinctCount)
    }
}

/// Gateway metrics
#[derive(Default)]
pub struct StatsMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,

    // Failure classes
    pub client_errors: AtomicU64,
    pub rate_limited: AtomicU64,
    pub store_unavailable: AtomicU64,
    pub internal_errors: AtomicU64,

    // Per-operation successes
    pub op_count: AtomicU64,
    pub op_distinct_count: AtomicU64,
    pub op_record: AtomicU64,
    pub op_anonymize: AtomicU64,
    pub op_erase: AtomicU64,

    // Records touched by privacy operations
    pub records_anonymized: AtomicU64,
    pub records_erased: AtomicU64,

    // Latency tracking
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl StatsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful operation
    pub fn record_success(&self, op: Operation, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_success.fetch_add(1, Ordering::Relaxed);
        self.operation_counter(op).fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_ms);
    }

    /// Record a failed request, classified by error
    pub fn record_error(&self, error: &StatsError, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = match error {
            StatsError::NoIdentity => &self.client_errors,
            StatsError::RateLimited { .. } => &self.rate_limited,
            StatsError::StoreUnavailable => &self.store_unavailable,
            StatsError::StoreOperationFailed(_) => &self.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_ms);
    }

    /// Record records affected by anonymize or erase
    pub fn record_affected(&self, op: Operation, affected: u64) {
        match op {
            Operation::Anonymize => {
                self.records_anonymized.fetch_add(affected, Ordering::Relaxed);
            }
            Operation::Erase => {
                self.records_erased.fetch_add(affected, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn operation_counter(&self, op: Operation) -> &AtomicU64 {
        match op {
            Operation::Count => &self.op_count,
            Operation::DistinctCount => &self.op_distinct_count,
            Operation::Record => &self.op_record,
            Operation::Anonymize => &self.op_anonymize,
            Operation::Erase => &self.op_erase,
        }
    }

    fn record_latency(&self, latency_ms: u64) {
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "success": self.requests_success.load(Ordering::Relaxed),
            },
            "errors": {
                "client": self.client_errors.load(Ordering::Relaxed),
                "rate_limited": self.rate_limited.load(Ordering::Relaxed),
                "store_unavailable": self.store_unavailable.load(Ordering::Relaxed),
                "internal": self.internal_errors.load(Ordering::Relaxed),
            },
            "operations": {
                "count": self.op_count.load(Ordering::Relaxed),
                "distinct_count": self.op_distinct_count.load(Ordering::Relaxed),
                "record": self.op_record.load(Ordering::Relaxed),
                "anonymize": self.op_anonymize.load(Ordering::Relaxed),
                "erase": self.op_erase.load(Ordering::Relaxed),
            },
            "records": {
                "anonymized": self.records_anonymized.load(Ordering::Relaxed),
                "erased": self.records_erased.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<StatsMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<StatsMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn succeed(self, op: Operation) {
        let latency_ms = self.elapsed_ms();
        self.metrics.record_success(op, latency_ms);
    }

    pub fn fail(self, error: &StatsError) {
        let latency_ms = self.elapsed_ms();
        self.metrics.record_error(error, latency_ms);
    }
}
