//! # vs-observability
//!
//! Logging setup shared by the Varonis SaaS connector binaries.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LogFormat, LoggingConfig};
