mod config;
mod constants;
mod data;
mod endpoint;
mod error;
mod stats;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use endpoint::*;
pub use error::*;
pub use stats::*;
