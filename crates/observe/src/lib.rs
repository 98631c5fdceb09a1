//! Logging setup shared by the crates of this workspace: subscriber
//! initialization for binaries and tests, and a panic hook that reports
//! through `tracing`.
pub mod config;
pub mod tracing;

pub use config::Config;
