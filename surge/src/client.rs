//! HTTP client collaborator.
//!
//! The driver only needs a single `GET`; connection pooling and timeouts are left to the
//! implementation.
use std::time::Duration;
use surge_core::RequestFailure;
use thiserror::Error;

/// What the driver needs from a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body_len: usize,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The target could not be reached at all (connection refused, timeout).
    #[error("Target unavailable: {0}")]
    Unavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<ClientError> for RequestFailure {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unavailable(msg) => RequestFailure::Unavailable(msg),
            ClientError::Transport(msg) => RequestFailure::Transport(msg),
        }
    }
}

#[trait_variant::make(HttpClient: Send)]
pub trait LocalHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ClientError>;
}

/// Pooled [`reqwest`] client.
#[derive(Clone, Debug, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, ClientError> {
        let res = self.client.get(url).send().await?;
        let status = res.status().as_u16();
        // NOTE: Drain the body so the connection goes back to the pool.
        let body = res.bytes().await?;
        Ok(HttpResponse {
            status,
            body_len: body.len(),
        })
    }
}
