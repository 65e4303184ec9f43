use std::num::NonZeroUsize;
use std::time::Duration;

/// Total of all endpoint weights. Draws are taken uniformly from `[0, WEIGHT_TOTAL)`.
pub const WEIGHT_TOTAL: f64 = 100.;

/// Allowed deviation of the weight sum from [`WEIGHT_TOTAL`].
pub const WEIGHT_EPSILON: f64 = 0.01;

/// Pause between two iterations of the same virtual user.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

/// Base address of the service under test.
pub const DEFAULT_TARGET: &str = "http://localhost:4221";

/// Paths of the simple, I/O-bound and compute-bound workloads, in that order.
pub const ENDPOINT_PATHS: [&str; 3] = ["/", "/io", "/compute"];

/// Weights used by the weighted traffic mix: 60% simple, 25% I/O, 15% compute.
pub const WEIGHTED_MIX: [f64; 3] = [60., 25., 15.];

pub const MAIN_VIRTUAL_USERS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(1000) };
pub const MAIN_DURATION: Duration = Duration::from_secs(100);

pub const WARMUP_VIRTUAL_USERS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(250) };
pub const WARMUP_DURATION: Duration = Duration::from_secs(20);

/// Build the full url of every workload endpoint for the given base address.
pub fn default_urls(base: &str) -> Vec<String> {
    let base = base.trim_end_matches('/');
    ENDPOINT_PATHS
        .iter()
        .map(|path| format!("{base}{path}"))
        .collect()
}
