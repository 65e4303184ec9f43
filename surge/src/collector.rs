use crate::measurement::Measurement;
use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use surge_core::{EndpointStatistics, Endpoints, IterationResult, RunConfig, RunStatistics};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Default)]
struct Checks {
    success: AtomicU64,
    failure: AtomicU64,
}

impl Checks {
    fn add(&self, success: bool) {
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn load(&self) -> (u64, u64) {
        (
            self.success.load(Ordering::Relaxed),
            self.failure.load(Ordering::Relaxed),
        )
    }
}

/// Lock-free sink for iteration results, shared by every virtual user of a run.
///
/// Results are folded into counters as they arrive; only their latencies are buffered, until
/// the next [`Collector::flush`].
#[derive(Clone)]
pub(crate) struct Collector {
    total: Arc<Checks>,
    endpoints: Arc<[Checks]>,
    latencies: Arc<AtomicBucket<Duration>>,
    measurement: Arc<Mutex<Measurement>>,
}

impl Collector {
    pub fn new(endpoint_count: usize) -> Self {
        Self {
            total: Arc::new(Checks::default()),
            endpoints: (0..endpoint_count).map(|_| Checks::default()).collect(),
            latencies: Arc::new(AtomicBucket::new()),
            measurement: Arc::new(Mutex::new(Measurement::new())),
        }
    }

    pub fn record(&self, result: IterationResult) {
        let Some(checks) = self.endpoints.get(result.index) else {
            error!("Result for unknown endpoint {}", result.endpoint);
            return;
        };
        checks.add(result.success);
        self.total.add(result.success);

        #[cfg(feature = "metrics")]
        record_metrics(&result);

        self.latencies.push(result.latency);
    }

    /// Checks passed and failed so far.
    pub fn counts(&self) -> (u64, u64) {
        self.total.load()
    }

    /// Move buffered latencies into the run's distribution.
    pub fn flush(&self) {
        let mut measurement = self
            .measurement
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.latencies
            .clear_with(|latencies| measurement.populate(latencies));
    }

    #[cfg(test)]
    pub(crate) fn buffered(&self) -> usize {
        self.latencies.data().len()
    }

    pub fn collect(
        &self,
        endpoints: &Endpoints,
        config: &RunConfig,
        elapsed: Duration,
    ) -> RunStatistics {
        self.flush();

        let (successes, failures) = self.counts();
        let iterations = successes + failures;
        let actual_rps = if elapsed.is_zero() {
            0.
        } else {
            iterations as f64 / elapsed.as_secs_f64()
        };

        let per_endpoint = endpoints
            .urls()
            .zip(self.endpoints.iter())
            .map(|(url, checks)| {
                let (successes, failures) = checks.load();
                EndpointStatistics {
                    url: url.to_string(),
                    iterations: successes + failures,
                    successes,
                    failures,
                }
            })
            .collect();

        let measurement = self
            .measurement
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        RunStatistics {
            virtual_users: config.virtual_users(),
            duration: config.duration(),
            elapsed,
            iterations,
            successes,
            failures,
            actual_rps,
            latency_p50: measurement.latency(0.5),
            latency_p90: measurement.latency(0.9),
            latency_p99: measurement.latency(0.99),
            endpoints: per_endpoint,
        }
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(result: &IterationResult) {
    let endpoint = result.endpoint.clone();
    metrics::histogram!("surge_iteration_latency", "endpoint" => endpoint.clone())
        .record(result.latency.as_secs_f64());

    if result.success {
        metrics::counter!("surge_iteration_success", "endpoint" => endpoint).increment(1);
    } else {
        metrics::counter!("surge_iteration_error", "endpoint" => endpoint).increment(1);
    }
}
