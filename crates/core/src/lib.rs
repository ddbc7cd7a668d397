pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model;
pub mod parse;
pub mod procfs;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{CoreError, Result};
pub use metrics::{MetricsCollector, Source};
pub use model::*;
pub use procfs::ProcFs;
