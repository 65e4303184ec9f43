use crate::client::HttpClient;
use crate::collector::Collector;
use crate::driver::LoadDriver;
use rand::{rngs::SmallRng, SeedableRng};
use std::sync::Arc;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Pool of virtual users. Each one is a tokio task looping over
/// [`LoadDriver::run_iteration`] until the driver's deadline passes.
pub(crate) struct VirtualUsers<C> {
    driver: Arc<LoadDriver<C>>,
    collector: Collector,
    seed: Option<u64>,
    tasks: Vec<JoinHandle<u64>>,
}

impl<C> VirtualUsers<C>
where
    C: HttpClient + Send + Sync + 'static,
{
    pub fn new(driver: Arc<LoadDriver<C>>, collector: Collector, seed: Option<u64>) -> Self {
        Self {
            driver,
            collector,
            seed,
            tasks: vec![],
        }
    }

    pub fn spawn(&mut self, count: usize) {
        while self.tasks.len() < count {
            let id = self.tasks.len();
            let driver = self.driver.clone();
            let collector = self.collector.clone();
            let rng = match self.seed {
                Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
                None => SmallRng::from_entropy(),
            };

            self.tasks.push(tokio::spawn(
                virtual_user(driver, collector, rng).instrument(tracing::trace_span!("vu", id)),
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every virtual user to finish its last iteration. In-flight requests are never
    /// aborted. Returns the total number of iterations run.
    pub async fn wait(self) -> u64 {
        let mut iterations = 0;
        for handle in self.tasks {
            match handle.await {
                Ok(count) => iterations += count,
                Err(err) => error!("Virtual user failed: {err}"),
            }
        }
        iterations
    }
}

async fn virtual_user<C>(driver: Arc<LoadDriver<C>>, collector: Collector, mut rng: SmallRng) -> u64
where
    C: HttpClient + Send + Sync + 'static,
{
    let mut iterations = 0;
    while let Some(result) = driver.run_iteration(&mut rng).await {
        collector.record(result);
        iterations += 1;
    }
    trace!("Finished after {iterations} iterations");
    iterations
}
