//! Error types for subscribing, delivering and publishing.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// A subscription could not be registered. Nothing was added to the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The broadcaster has been shut down.
    #[error("broadcaster is shutting down")]
    ShuttingDown,
    /// The subscriber limit is reached.
    #[error("subscriber limit of {limit} reached")]
    CapacityExceeded {
        /// Configured maximum.
        limit: usize,
    },
}

/// One write to one subscriber failed. Never surfaced to publishers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The peer is gone (receiver dropped, broken pipe).
    #[error("subscriber transport closed")]
    Closed,
    /// The write did not complete within the timeout.
    #[error("write timed out after {0:?}")]
    TimedOut(Duration),
}

/// The publish call itself failed before any subscriber was touched.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The payload could not be encoded as JSON.
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

impl IntoResponse for BroadcastError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
