#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
pub mod driver;
pub mod run;

pub(crate) mod collector;
pub(crate) mod measurement;
pub(crate) mod scheduler;
pub(crate) mod timer;

pub use client::{ClientError, HttpClient, HttpResponse, ReqwestClient};
pub use driver::{run_iteration, select_endpoint, LoadDriver};
pub use run::LoadTest;

pub mod prelude {
    pub use crate::client::{HttpClient, ReqwestClient};
    pub use crate::run::LoadTest;

    pub use surge_core::{
        default_urls, ConfigError, EndpointSpec, Endpoints, RunConfig, RunStatistics,
        TrafficMix, DEFAULT_TARGET,
    };
}
