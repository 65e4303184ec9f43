pub mod runtime;

mod error;

pub use crate::error::RuntimeError;
pub use crate::runtime::SurgeRuntime;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "surge=info,surge_runtime=info";

/// Install a formatting subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();
}
