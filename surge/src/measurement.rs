use pdatastructs::tdigest::{TDigest, K1};
use std::time::Duration;
use tracing::error;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Latency distribution of a run.
pub(crate) struct Measurement {
    samples: u64,
    latency: TDigest<K1>,
}

impl Measurement {
    pub fn new() -> Self {
        Self {
            samples: 0,
            latency: default_tdigest(),
        }
    }

    pub fn populate(&mut self, latencies: &[Duration]) {
        for latency in latencies {
            self.latency.insert(latency.as_secs_f64());
        }
        self.samples += latencies.len() as u64;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }

        let secs = self.latency.quantile(quantile);

        // NOTE: TDigest can return NaN for degenerate inputs.
        let secs = if secs.is_finite() && secs >= 0. {
            secs
        } else {
            error!("NaN latency calculation.");
            0.
        };

        Duration::from_secs_f64(secs)
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
