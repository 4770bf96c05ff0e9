//! Gateway error types and their HTTP mapping.
//!
//! Every failure the statistics endpoints can produce is a `StatsError`.
//! Responses carry a JSON body `{"error": <code>, "message": <text>}`; store
//! internals are logged, never returned to the client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use stats_store::StoreError;
use std::time::Duration;

/// Machine-readable error codes
pub mod codes {
    pub const STORE_UNAVAILABLE: &str = "store_unavailable";
    pub const NO_IDENTITY: &str = "no_identity";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Failures of the statistics operations.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// The Event Store is not connected.
    #[error("Database is not running, sorry!")]
    StoreUnavailable,

    /// No client address could be determined for the request.
    #[error("The server could not determine your IP address")]
    NoIdentity,

    /// The caller exhausted its admission window.
    #[error("Too many requests, please try again later.")]
    RateLimited { retry_after: Duration },

    /// The store call itself failed.
    #[error("store operation failed: {0}")]
    StoreOperationFailed(#[from] StoreError),
}

impl StatsError {
    pub fn status(&self) -> StatusCode {
        match self {
            StatsError::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            StatsError::NoIdentity => StatusCode::BAD_REQUEST,
            StatsError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            StatsError::StoreOperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StatsError::StoreUnavailable => codes::STORE_UNAVAILABLE,
            StatsError::NoIdentity => codes::NO_IDENTITY,
            StatsError::RateLimited { .. } => codes::RATE_LIMITED,
            StatsError::StoreOperationFailed(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Message safe to send to the client.
    pub fn public_message(&self) -> String {
        match self {
            StatsError::StoreOperationFailed(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// `Retry-After` value in whole seconds, rounded up, at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            StatsError::RateLimited { retry_after } => {
                let millis = retry_after.as_millis() as u64;
                Some(millis.div_ceil(1000).max(1))
            }
            _ => None,
        }
    }
}

/// JSON error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for StatsError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code().to_string(),
            message: self.public_message(),
        };
        let mut response = (self.status(), Json(body)).into_response();

        if let Some(secs) = self.retry_after_secs() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

/// Result type for statistics operations
pub type StatsResult<T> = Result<T, StatsError>;

/// Server lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Server(String),
}
