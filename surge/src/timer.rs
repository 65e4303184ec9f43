use crate::collector::Collector;
use std::time::Duration;
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Periodic progress reporter for a running load test.
pub(crate) struct ProgressReporter {
    collector: Collector,
    ticks: Interval,
    period: Duration,
    last_report: Instant,
    last_counts: (u64, u64),
}

impl ProgressReporter {
    pub fn new(collector: Collector, period: Duration) -> Self {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            collector,
            ticks,
            period,
            last_report: Instant::now(),
            last_counts: (0, 0),
        }
    }

    /// Wait for the next period, fold buffered latencies, and report the checks made during it.
    pub async fn report(&mut self) -> f64 {
        self.ticks.tick().await;
        self.collector.flush();

        let now = Instant::now();
        let window = now.duration_since(self.last_report);
        let (success, failure) = self.collector.counts();
        let (prev_success, prev_failure) = self.last_counts;

        let checks = (success - prev_success) + (failure - prev_failure);
        let rps = if window.is_zero() {
            0.
        } else {
            checks as f64 / window.as_secs_f64()
        };

        self.last_report = now;
        self.last_counts = (success, failure);
        rps
    }

    pub async fn run(mut self) {
        debug!(
            "Reporting progress every {}",
            humantime::format_duration(self.period)
        );

        // NOTE: The first tick of an interval completes immediately.
        self.ticks.tick().await;
        self.last_report = Instant::now();

        loop {
            let rps = self.report().await;
            let (success, failure) = self.last_counts;
            info!("checks_passed={success} checks_failed={failure} rps={rps:.2}");
        }
    }
}

/// Log check counts and throughput every `period` until aborted.
pub(crate) async fn progress_task(collector: Collector, period: Duration) {
    ProgressReporter::new(collector, period).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::IterationResult;
    use tracing::Instrument;

    fn pass() -> IterationResult {
        IterationResult::from_status(0, "http://a/", 200, Duration::from_millis(1))
    }

    #[tokio::test(start_paused = true)]
    async fn reports_window_rate() {
        let collector = Collector::new(1);
        let mut reporter = ProgressReporter::new(collector.clone(), Duration::from_secs(2));
        reporter.report().await;

        for _ in 0..10 {
            collector.record(pass());
        }
        assert_eq!(reporter.report().await, 5.);
        assert_eq!(reporter.report().await, 0.);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_flushes_latencies() {
        let collector = Collector::new(1);
        let handle = tokio::spawn(progress_task(collector.clone(), Duration::from_secs(1)));
        for _ in 0..5 {
            collector.record(pass());
        }
        assert_eq!(collector.buffered(), 5);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.abort();

        assert_eq!(collector.buffered(), 0);
        assert_eq!(collector.counts(), (5, 0));
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn progress_is_logged() {
        let collector = Collector::new(1);
        collector.record(pass());

        let handle =
            tokio::spawn(progress_task(collector, Duration::from_secs(1)).in_current_span());
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.abort();

        assert!(logs_contain("checks_passed=1 checks_failed=0"));
    }
}
