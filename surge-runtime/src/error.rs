use std::net::AddrParseError;
use surge::ClientError;
use surge_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Invalid metrics address: {0}")]
    MetricsAddr(#[from] AddrParseError),

    #[error("Unable to install metrics exporter: {0}")]
    Metrics(String),
}
