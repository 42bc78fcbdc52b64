pub mod config;
pub mod error;
pub mod invocation;
pub mod jobs;
pub mod naming;
pub mod outputs;
pub mod pipeline;
pub mod provider;
pub mod reshape;

pub use tickerflux_bucket as bucket;
