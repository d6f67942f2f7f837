//! Error taxonomy for the fetch, persist and respond path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Failures of a single quote request, on either side of the wire.
///
/// None of these are retried. The server turns every variant into a
/// `500 Internal Server Error` carrying the error text; the client reports
/// it and exits.
#[derive(Error, Debug)]
pub enum RateError {
    /// Upstream unreachable, malformed, or too slow.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Storage unreachable, write failed, or too slow.
    #[error("persist failed: {0}")]
    Persist(String),

    /// Response body could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Any failure of the client's request, decode and write sequence.
    #[error("client failed: {0}")]
    Client(String),
}

impl RateError {
    pub fn fetch(err: impl ToString) -> Self {
        RateError::Fetch(err.to_string())
    }

    pub fn persist(err: impl ToString) -> Self {
        RateError::Persist(err.to_string())
    }

    pub fn client(err: impl ToString) -> Self {
        RateError::Client(err.to_string())
    }

    pub fn fetch_deadline(deadline: Duration) -> Self {
        RateError::Fetch(format!("deadline of {}ms exceeded", deadline.as_millis()))
    }

    pub fn persist_deadline(deadline: Duration) -> Self {
        RateError::Persist(format!("deadline of {}ms exceeded", deadline.as_millis()))
    }

    pub fn client_deadline(deadline: Duration) -> Self {
        RateError::Client(format!("deadline of {}ms exceeded", deadline.as_millis()))
    }
}

impl IntoResponse for RateError {
    fn into_response(self) -> Response {
        error!(error = %self, "Quote request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
