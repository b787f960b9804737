//! Parley Runtime - configuration and logging for Parley connectors.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`)
//! - The logging schema (`LoggingConfig`) and subscriber setup (`LoggingBuilder`)
//!
//! ```ignore
//! use parley_adapter_botkit::{ConnectorConfig, ENV_ALIASES, ENV_PREFIX};
//! use parley_runtime::config::{ConfigLoader, load_logging_config};
//! use parley_runtime::logging;
//!
//! logging::init_from_config(&load_logging_config()?);
//!
//! let config: ConnectorConfig = ConfigLoader::new()
//!     .env_prefix(ENV_PREFIX)
//!     .env_aliases(ENV_ALIASES)
//!     .load()?;
//! ```

pub mod config;
pub mod logging;

pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use logging::{LoggingBuilder, init_from_config};
