use thiserror::Error;

/// Invalid run configuration. Always fatal: no traffic is generated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Virtual user count must be positive")]
    InvalidVirtualUsers,

    #[error("Run duration must be positive")]
    InvalidDuration,

    #[error("No endpoints configured")]
    Empty,

    #[error("Endpoint weights sum to {0}, expected 100")]
    WeightSum(f64),

    #[error("Invalid weight {weight} for endpoint {url}")]
    InvalidWeight { url: String, weight: f64 },

    #[error("Expected {expected} weights, found {found}")]
    WeightCount { expected: usize, found: usize },

    #[error("Invalid endpoint url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unknown traffic mix: {0}")]
    UnknownMix(String),
}
