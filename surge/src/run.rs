//! Load test runs.
use crate::client::{ClientError, HttpClient, ReqwestClient};
use crate::collector::Collector;
use crate::driver::LoadDriver;
use crate::scheduler::VirtualUsers;
use crate::timer::progress_task;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use surge_core::{Endpoints, RunConfig, RunStatistics};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// A configured load test. Awaiting it runs every virtual user for the configured duration
/// and resolves to the aggregated [`RunStatistics`].
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use surge::prelude::*;
///
/// #[tokio::main]
/// async fn main() {
///     let urls = default_urls(DEFAULT_TARGET);
///     let endpoints = TrafficMix::weighted().endpoints(&urls).unwrap();
///     let config = RunConfig::new(250, Duration::from_secs(20)).unwrap();
///
///     let stats = LoadTest::new(endpoints, config).unwrap().await;
///     println!("{stats}");
/// }
/// ```
pub struct LoadTest<C> {
    endpoints: Arc<Endpoints>,
    config: RunConfig,
    client: Arc<C>,
    seed: Option<u64>,
    runner_fut: Option<Pin<Box<dyn Future<Output = RunStatistics> + Send>>>,
}

impl LoadTest<ReqwestClient> {
    /// Run against real targets, honoring the configured request timeout.
    pub fn new(endpoints: Endpoints, config: RunConfig) -> Result<Self, ClientError> {
        let client = match config.timeout() {
            Some(timeout) => ReqwestClient::with_timeout(timeout)?,
            None => ReqwestClient::new(),
        };
        Ok(Self::with_client(endpoints, config, client))
    }
}

impl<C> LoadTest<C> {
    pub fn with_client(endpoints: Endpoints, config: RunConfig, client: C) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            config,
            client: Arc::new(client),
            seed: None,
            runner_fut: None,
        }
    }

    /// Seed the endpoint selection of every virtual user, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

impl<C> Future for LoadTest<C>
where
    C: HttpClient + Send + Sync + 'static,
{
    type Output = RunStatistics;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let endpoints = self.endpoints.clone();
            let config = self.config.clone();
            let client = self.client.clone();
            let seed = self.seed;
            self.runner_fut = Some(Box::pin(
                async move { run_load_test(endpoints, config, client, seed).await }
                    .in_current_span(),
            ));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

#[instrument(name = "load_test", skip_all, fields(vus = config.virtual_users()))]
pub(crate) async fn run_load_test<C>(
    endpoints: Arc<Endpoints>,
    config: RunConfig,
    client: Arc<C>,
    seed: Option<u64>,
) -> RunStatistics
where
    C: HttpClient + Send + Sync + 'static,
{
    info!("Running load test with {config} against [{endpoints}]");

    let start = Instant::now();
    let deadline = start + config.duration();

    let driver = LoadDriver::new(endpoints.clone(), client)
        .pause(config.pause_duration())
        .deadline(deadline)
        .limiter(config.max_rps().map(|rps| Arc::new(rate_limiter(rps))));

    let collector = Collector::new(endpoints.len());
    let progress =
        tokio::spawn(progress_task(collector.clone(), PROGRESS_INTERVAL).in_current_span());

    let mut users = VirtualUsers::new(Arc::new(driver), collector.clone(), seed);
    users.spawn(config.virtual_users());
    debug!("Spawned {} virtual users", users.len());

    let iterations = users.wait().await;
    progress.abort();

    let elapsed = start.elapsed();
    let stats = collector.collect(&endpoints, &config, elapsed);
    debug_assert_eq!(iterations, stats.iterations);

    info!(
        "Load test complete: {} iterations, {} failed checks in {}",
        stats.iterations,
        stats.failures,
        humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)),
    );

    stats
}

fn rate_limiter(rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(rps).allow_burst(NonZeroU32::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use std::sync::Mutex;
    use surge_core::{default_urls, EndpointSpec, TrafficMix, DEFAULT_TARGET};

    /// Forwards to a shared mock so the test can inspect calls after the run.
    struct Shared(Arc<MockClient>);

    impl HttpClient for Shared {
        async fn get(&self, url: &str) -> Result<crate::HttpResponse, ClientError> {
            self.0.get(url).await
        }
    }

    /// Records when each request was sent.
    struct Stamped(Arc<Mutex<Vec<Instant>>>);

    impl HttpClient for Stamped {
        async fn get(&self, _url: &str) -> Result<crate::HttpResponse, ClientError> {
            self.0.lock().unwrap().push(Instant::now());
            Ok(crate::HttpResponse {
                status: 200,
                body_len: 0,
            })
        }
    }

    fn equal_endpoints(urls: &[String]) -> Endpoints {
        Endpoints::new(&[
            EndpointSpec::new(&urls[0], 33.3),
            EndpointSpec::new(&urls[1], 33.3),
            EndpointSpec::new(&urls[2], 33.4),
        ])
        .unwrap()
    }

    #[tracing_test::traced_test]
    #[tokio::test(start_paused = true)]
    async fn all_checks_pass() {
        let urls = default_urls(DEFAULT_TARGET);
        let client = Arc::new(MockClient::new());
        let config = RunConfig::new(10, Duration::from_secs(5)).unwrap();

        let stats = LoadTest::with_client(equal_endpoints(&urls), config, Shared(client.clone()))
            .seed(1)
            .await;

        // Each virtual user starts an iteration at t = 0, 1, 2, 3 and 4 seconds.
        assert_eq!(stats.iterations, 50);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.successes, 50);
        assert_eq!(client.total(), 50);
        assert!(stats.elapsed >= Duration::from_secs(5));

        for url in &urls {
            let endpoint = stats.endpoint(url).unwrap();
            assert_eq!(endpoint.failures, 0);
            assert_eq!(endpoint.iterations, client.calls(url));
            assert!(endpoint.iterations >= 5, "{url}: {endpoint:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn traffic_splits_evenly() {
        let urls = default_urls(DEFAULT_TARGET);
        let config = RunConfig::new(10, Duration::from_secs(5))
            .unwrap()
            .pause(Duration::from_millis(10));

        let stats = LoadTest::with_client(equal_endpoints(&urls), config, MockClient::new())
            .seed(2)
            .await;

        // 10 virtual users, one iteration every 10ms for 5s.
        assert!(stats.iterations > 4_500 && stats.iterations <= 5_000);
        for url in &urls {
            let share = stats.endpoint(url).unwrap().iterations as f64 / stats.iterations as f64;
            assert!((share - 1. / 3.).abs() < 0.05, "{url}: {share}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failing_endpoint_is_recorded() {
        let urls = default_urls(DEFAULT_TARGET);
        let client = MockClient::new().status(&urls[2], 500);
        let config = RunConfig::new(10, Duration::from_secs(5)).unwrap();

        let stats = LoadTest::with_client(equal_endpoints(&urls), config, client)
            .seed(3)
            .await;

        assert_eq!(stats.iterations, 50);
        assert!(stats.elapsed >= Duration::from_secs(5));

        let compute = stats.endpoint(&urls[2]).unwrap();
        assert!(compute.iterations > 0);
        assert_eq!(compute.failures, compute.iterations);
        assert_eq!(compute.successes, 0);

        for url in &urls[..2] {
            let endpoint = stats.endpoint(url).unwrap();
            assert_eq!(endpoint.failures, 0);
            assert_eq!(endpoint.successes, endpoint.iterations);
        }
        assert_eq!(stats.failures, compute.iterations);
    }

    #[tokio::test(start_paused = true)]
    async fn weighted_mix_run() {
        let urls = default_urls(DEFAULT_TARGET);
        let endpoints = TrafficMix::weighted().endpoints(&urls).unwrap();
        let config = RunConfig::new(20, Duration::from_secs(10))
            .unwrap()
            .pause(Duration::from_millis(10));

        let stats = LoadTest::with_client(endpoints, config, MockClient::new())
            .seed(4)
            .await;

        let share = |url: &str| {
            stats.endpoint(url).unwrap().iterations as f64 / stats.iterations as f64
        };
        assert!((share(&urls[0]) - 0.60).abs() < 0.03);
        assert!((share(&urls[1]) - 0.25).abs() < 0.03);
        assert!((share(&urls[2]) - 0.15).abs() < 0.03);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn rps_limit_caps_throughput() {
        let urls = default_urls(DEFAULT_TARGET);
        let endpoints = TrafficMix::Uniform.endpoints(&urls).unwrap();
        let config = RunConfig::new(5, Duration::from_secs(2))
            .unwrap()
            .pause(Duration::ZERO)
            .rps_limit(NonZeroU32::new(20).unwrap());

        let stats = LoadTest::with_client(endpoints, config, MockClient::new()).await;

        // 20 tokens per second over 2s, the first one immediately.
        assert!(stats.iterations <= 41, "{}", stats.iterations);
        assert!(stats.iterations >= 30, "{}", stats.iterations);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn rps_limit_sends_nothing_after_deadline() {
        let sent = Arc::new(Mutex::new(vec![]));
        let endpoints = TrafficMix::Uniform
            .endpoints(&default_urls(DEFAULT_TARGET))
            .unwrap();
        let config = RunConfig::new(5, Duration::from_secs(1))
            .unwrap()
            .pause(Duration::ZERO)
            .rps_limit(NonZeroU32::new(2).unwrap());

        let start = Instant::now();
        let stats = LoadTest::with_client(endpoints, config, Stamped(sent.clone())).await;

        let sent = sent.lock().unwrap();
        let late: Vec<_> = sent
            .iter()
            .map(|at| at.duration_since(start))
            .filter(|offset| *offset >= Duration::from_millis(1_050))
            .collect();
        assert!(late.is_empty(), "requests after the deadline: {late:?}");
        assert_eq!(stats.iterations, sent.len() as u64);
        assert!(stats.iterations <= 3, "{}", stats.iterations);
        assert!(stats.elapsed < Duration::from_millis(1_200), "{:?}", stats.elapsed);
    }
}
