//! Configuration module for Parley.
//!
//! Provides figment-based layered loading for connector settings and the
//! logging schema.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, LOG_ENV_PREFIX, load_logging_config};
pub use schema::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};
