//! The load driver: select an endpoint, issue one request, check it, pause.
use crate::client::HttpClient;
use governor::DefaultDirectRateLimiter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use surge_core::{ConfigError, EndpointSpec, Endpoints, IterationResult};
use tokio::time::{timeout_at, Instant};
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

/// Validate `specs` and pick one url according to their weights.
///
/// Hot paths should build an [`Endpoints`] table once and use [`Endpoints::pick`] instead.
pub fn select_endpoint<'a, R: Rng + ?Sized>(
    specs: &'a [EndpointSpec],
    rng: &mut R,
) -> Result<&'a str, ConfigError> {
    let idx = Endpoints::new(specs)?.pick_index(rng);
    Ok(&specs[idx].url)
}

/// Issue a `GET` against the endpoint at `idx` and check its status.
///
/// Failures are recorded on the returned result, never raised.
pub async fn check<C: HttpClient>(endpoints: &Endpoints, client: &C, idx: usize) -> IterationResult {
    let url = endpoints.url(idx);

    let start = Instant::now();
    let res = client.get(url).await;
    let latency = start.elapsed();

    let result = match res {
        Ok(res) => IterationResult::from_status(idx, url, res.status, latency),
        Err(err) => IterationResult::from_failure(idx, url, err.into(), latency),
    };

    match &result.failure {
        None => trace!("GET {url} passed in {latency:?}"),
        Some(failure) => debug!("GET {url} failed: {failure}"),
    }

    result
}

/// One full iteration: select, request, check, then pause.
pub async fn run_iteration<C, R>(
    endpoints: &Endpoints,
    client: &C,
    pause: Duration,
    rng: &mut R,
) -> IterationResult
where
    C: HttpClient,
    R: Rng + ?Sized,
{
    let idx = endpoints.pick_index(rng);
    let result = check(endpoints, client, idx).await;
    tokio::time::sleep(pause).await;
    result
}

/// Iteration entry point shared by every virtual user of a run.
pub struct LoadDriver<C> {
    endpoints: Arc<Endpoints>,
    client: Arc<C>,
    pause: Duration,
    deadline: Option<Instant>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl<C: HttpClient> LoadDriver<C> {
    pub fn new(endpoints: Arc<Endpoints>, client: Arc<C>) -> Self {
        Self {
            endpoints,
            client,
            pause: surge_core::DEFAULT_PAUSE,
            deadline: None,
            limiter: None,
        }
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// End of the run. Pauses never extend past it.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Rate limiter shared by all virtual users, awaited before every request.
    pub fn limiter(mut self, limiter: Option<Arc<DefaultDirectRateLimiter>>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Run one iteration, unless the deadline passes before the request can be sent.
    ///
    /// Returns `None` without sending anything once the deadline is reached, including while
    /// waiting on the rate limiter.
    pub async fn run_iteration<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<IterationResult> {
        if self.expired() {
            return None;
        }

        let idx = self.endpoints.pick_index(rng);

        if let Some(limiter) = &self.limiter {
            match self.deadline {
                Some(deadline) => {
                    if timeout_at(deadline, limiter.until_ready()).await.is_err() {
                        trace!("Deadline reached while waiting on the rate limiter");
                        return None;
                    }
                }
                None => limiter.until_ready().await,
            }

            if self.expired() {
                return None;
            }
        }

        let result = check(&self.endpoints, self.client.as_ref(), idx).await;

        let wake = Instant::now() + self.pause;
        let wake = match self.deadline {
            Some(deadline) => wake.min(deadline),
            None => wake,
        };
        tokio::time::sleep_until(wake).await;

        Some(result)
    }
}
