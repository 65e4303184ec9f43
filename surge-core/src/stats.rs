use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub virtual_users: usize,
    pub duration: Duration,
    pub elapsed: Duration,
    pub iterations: u64,
    pub successes: u64,
    pub failures: u64,
    pub actual_rps: f64,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p99: Duration,
    pub endpoints: Vec<EndpointStatistics>,
}

/// Per-endpoint counts, in endpoint table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointStatistics {
    pub url: String,
    pub iterations: u64,
    pub successes: u64,
    pub failures: u64,
}

impl RunStatistics {
    pub fn error_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.
        } else {
            self.failures as f64 / self.iterations as f64
        }
    }

    pub fn endpoint(&self, url: &str) -> Option<&EndpointStatistics> {
        self.endpoints.iter().find(|e| e.url == url)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "vus={} elapsed={} iterations={} checks_passed={} checks_failed={} error_rate={:.2}% rps={:.2}",
            self.virtual_users,
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64)),
            self.iterations,
            self.successes,
            self.failures,
            self.error_rate() * 100.,
            self.actual_rps,
        )?;
        writeln!(
            f,
            "latency p50={:?} p90={:?} p99={:?}",
            self.latency_p50, self.latency_p90, self.latency_p99,
        )?;
        for endpoint in &self.endpoints {
            writeln!(
                f,
                "  {} iterations={} passed={} failed={}",
                endpoint.url, endpoint.iterations, endpoint.successes, endpoint.failures,
            )?;
        }
        Ok(())
    }
}
