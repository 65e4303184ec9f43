use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Status a response must carry for its check to pass.
pub const EXPECTED_STATUS: u16 = 200;

/// Why an iteration's check failed. Recorded on the result, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RequestFailure {
    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Target unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of one request-check-pause cycle.
#[derive(Debug, Clone, Serialize)]
pub struct IterationResult {
    /// Position of the selected endpoint in the endpoint table.
    pub index: usize,
    pub endpoint: String,
    /// `None` when no response was received.
    pub status: Option<u16>,
    pub success: bool,
    pub latency: Duration,
    pub failure: Option<RequestFailure>,
}

impl IterationResult {
    pub fn from_status(
        index: usize,
        endpoint: impl Into<String>,
        status: u16,
        latency: Duration,
    ) -> Self {
        let success = status == EXPECTED_STATUS;
        Self {
            index,
            endpoint: endpoint.into(),
            status: Some(status),
            success,
            latency,
            failure: (!success).then_some(RequestFailure::Status(status)),
        }
    }

    pub fn from_failure(
        index: usize,
        endpoint: impl Into<String>,
        failure: RequestFailure,
        latency: Duration,
    ) -> Self {
        Self {
            index,
            endpoint: endpoint.into(),
            status: None,
            success: false,
            latency,
            failure: Some(failure),
        }
    }
}
