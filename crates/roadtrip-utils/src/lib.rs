//! Roadtrip Utils - Shared helpers

pub mod config;
pub mod telemetry;

pub use config::{env_or, load_env};
pub use telemetry::{init_test_tracing, init_tracing};
