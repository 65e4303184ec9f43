//! Default surge runtime
//!
//! Parses the command line and environment, optionally warms the target up, then runs the
//! configured load test and logs its statistics.
use crate::error::RuntimeError;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use surge::LoadTest;
use surge_core::{
    default_urls, Endpoints, RunConfig, RunStatistics, TrafficMix, DEFAULT_TARGET,
    MAIN_DURATION, MAIN_VIRTUAL_USERS,
};
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn, Instrument};

pub const TARGET_VAR: &str = "SURGE_TARGET";
pub const MIX_VAR: &str = "SURGE_MIX";
pub const WARMUP_VAR: &str = "SURGE_WARMUP";
pub const METRICS_VAR: &str = "SURGE_METRICS_ADDR";

#[derive(Parser, Debug)]
#[command(name = "surge", version, about = "Weighted synthetic HTTP load generator")]
struct SurgeCli {
    /// Number of concurrent virtual users
    #[arg(short = 'u', long, default_value_t = MAIN_VIRTUAL_USERS.get())]
    vus: usize,

    /// Run duration, e.g. `100s` or `2m`
    #[arg(short, long, default_value_t = MAIN_DURATION.into())]
    duration: humantime::Duration,
}

/// Default surge runtime.
///
/// # Example
///
/// ```no_run
/// use surge_runtime::SurgeRuntime;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     SurgeRuntime::new()
///         .with_args()
///         .with_env()?
///         .run()
///         .await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SurgeRuntime {
    vus: usize,
    duration: Duration,
    target: String,
    mix: TrafficMix,
    warmup: bool,
    metrics_addr: Option<SocketAddr>,
}

impl Default for SurgeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SurgeRuntime {
    pub fn new() -> Self {
        Self {
            vus: MAIN_VIRTUAL_USERS.get(),
            duration: MAIN_DURATION,
            target: DEFAULT_TARGET.to_string(),
            mix: TrafficMix::Uniform,
            warmup: false,
            metrics_addr: None,
        }
    }

    /// Use the command line arguments.
    ///
    /// `-u`, `--vus` for the number of virtual users (default `1000`)
    ///
    /// `-d`, `--duration` for the run duration (default `100s`)
    pub fn with_args(self) -> Self {
        self.apply_args(SurgeCli::parse())
    }

    fn apply_args(mut self, args: SurgeCli) -> Self {
        self.vus = args.vus;
        self.duration = args.duration.into();
        self
    }

    /// Use the `SURGE_*` environment variables.
    ///
    /// `SURGE_TARGET` base url of the service under test (default `http://localhost:4221`)
    ///
    /// `SURGE_MIX` traffic mix: `uniform` (default), `weighted`, or a list such as `50,30,20`
    ///
    /// `SURGE_WARMUP` run the 250 VU / 20s warm-up before the main run when `1` or `true`
    ///
    /// `SURGE_METRICS_ADDR` serve Prometheus metrics on this address
    pub fn with_env(self) -> Result<Self, RuntimeError> {
        self.apply_env(|var| std::env::var(var).ok())
    }

    fn apply_env<F>(mut self, lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(target) = lookup(TARGET_VAR) {
            self.target = target;
        }

        if let Some(mix) = lookup(MIX_VAR) {
            self.mix = mix.parse()?;
        }

        if let Some(warmup) = lookup(WARMUP_VAR) {
            self.warmup = match warmup.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(RuntimeError::InvalidEnv {
                        var: WARMUP_VAR,
                        value: warmup,
                    })
                }
            };
        }

        if let Some(addr) = lookup(METRICS_VAR) {
            self.metrics_addr = Some(addr.parse()?);
        }

        Ok(self)
    }

    pub fn vus(mut self, vus: usize) -> Self {
        self.vus = vus;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn mix(mut self, mix: TrafficMix) -> Self {
        self.mix = mix;
        self
    }

    pub fn warmup(mut self, warmup: bool) -> Self {
        self.warmup = warmup;
        self
    }

    /// Validate the configuration. Nothing is sent before this succeeds.
    pub fn build(&self) -> Result<(Endpoints, RunConfig), RuntimeError> {
        let config = RunConfig::new(self.vus, self.duration)?;
        let endpoints = self.mix.endpoints(&default_urls(&self.target))?;
        Ok((endpoints, config))
    }

    #[instrument(name = "surge", skip_all, fields(target = %self.target))]
    pub async fn run(self) -> Result<RunStatistics, RuntimeError> {
        let (endpoints, config) = self.build().inspect_err(|err| error!("{err}"))?;

        if let Some(addr) = self.metrics_addr {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .map_err(|err| RuntimeError::Metrics(err.to_string()))?;
            info!("Serving metrics on {addr}");
        }

        info!("Traffic mix: {}", self.mix);

        if self.warmup {
            info!("Warming up");
            let stats = LoadTest::new(endpoints.clone(), RunConfig::warmup())?.await;
            info!("Warm-up statistics:\n{stats}");
        }

        let stats = LoadTest::new(endpoints, config)?.await;
        info!("Run statistics:\n{stats}");

        Ok(stats)
    }
}
