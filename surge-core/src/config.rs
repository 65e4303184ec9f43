use crate::{
    ConfigError, DEFAULT_PAUSE, MAIN_DURATION, MAIN_VIRTUAL_USERS, WARMUP_DURATION,
    WARMUP_VIRTUAL_USERS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

/// Immutable parameters of a single run.
///
/// Built with [`RunConfig::new`], which rejects a zero virtual user count or a zero duration.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRunConfig")]
pub struct RunConfig {
    virtual_users: NonZeroUsize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    duration: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pause: Duration,
    rps_limit: Option<NonZeroU32>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    request_timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(virtual_users: usize, duration: Duration) -> Result<Self, ConfigError> {
        let virtual_users =
            NonZeroUsize::new(virtual_users).ok_or(ConfigError::InvalidVirtualUsers)?;
        if duration.is_zero() {
            return Err(ConfigError::InvalidDuration);
        }

        Ok(Self {
            virtual_users,
            duration,
            pause: DEFAULT_PAUSE,
            rps_limit: None,
            request_timeout: None,
        })
    }

    /// 1000 virtual users for 100 seconds.
    pub fn main() -> Self {
        Self::preset(MAIN_VIRTUAL_USERS, MAIN_DURATION)
    }

    /// 250 virtual users for 20 seconds, used to warm the target up before a main run.
    pub fn warmup() -> Self {
        Self::preset(WARMUP_VIRTUAL_USERS, WARMUP_DURATION)
    }

    fn preset(virtual_users: NonZeroUsize, duration: Duration) -> Self {
        Self {
            virtual_users,
            duration,
            pause: DEFAULT_PAUSE,
            rps_limit: None,
            request_timeout: None,
        }
    }

    /// Override the pause between iterations (1s by default).
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Cap the request rate across all virtual users.
    pub fn rps_limit(mut self, rps: NonZeroU32) -> Self {
        self.rps_limit = Some(rps);
        self
    }

    /// Per-request timeout. Without it the HTTP client's own default applies.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn virtual_users(&self) -> usize {
        self.virtual_users.get()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pause_duration(&self) -> Duration {
        self.pause
    }

    pub fn max_rps(&self) -> Option<NonZeroU32> {
        self.rps_limit
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vus={}, duration={}, pause={}",
            self.virtual_users,
            humantime::format_duration(self.duration),
            humantime::format_duration(self.pause),
        )?;
        if let Some(rps) = self.rps_limit {
            write!(f, ", rps_limit={rps}")?;
        }
        if let Some(timeout) = self.request_timeout {
            write!(f, ", timeout={}", humantime::format_duration(timeout))?;
        }
        Ok(())
    }
}

#[serde_as]
#[derive(Deserialize)]
struct RawRunConfig {
    virtual_users: usize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    duration: Duration,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pause: Option<Duration>,
    #[serde(default)]
    rps_limit: Option<NonZeroU32>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    request_timeout: Option<Duration>,
}

impl TryFrom<RawRunConfig> for RunConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRunConfig) -> Result<Self, Self::Error> {
        let mut config = RunConfig::new(raw.virtual_users, raw.duration)?;
        if let Some(pause) = raw.pause {
            config.pause = pause;
        }
        config.rps_limit = raw.rps_limit;
        config.request_timeout = raw.request_timeout;
        Ok(config)
    }
}
