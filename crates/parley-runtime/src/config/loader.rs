//! Configuration loader using figment.
//!
//! [`ConfigLoader`] extracts any serde type from layered sources.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. The type's `Default`
//! 2. A configuration file (`toml-config` feature)
//! 3. Environment variables under the configured prefix
//! 4. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! The prefix is stripped and the rest lowercased; `__` separates nested keys.
//! Aliases rename keys whose environment spelling differs from the field:
//!
//! - `BOTKIT_SERVER_URL=ws://bot:3000` → `server_url`
//! - `BOTKIT_WEBSOCKET=true` → `use_socket_transport` (alias `websocket`)
//! - `PARLEY_LOG_FILTERS__PARLEY_CORE=trace` → `filters.parley_core`
//!
//! # Example
//!
//! ```rust,ignore
//! use parley_adapter_botkit::{ConnectorConfig, ENV_ALIASES, ENV_PREFIX};
//! use parley_runtime::config::ConfigLoader;
//!
//! let config: ConnectorConfig = ConfigLoader::new()
//!     .env_prefix(ENV_PREFIX)
//!     .env_aliases(ENV_ALIASES)
//!     .set("fixed_user_id", "tester-1")
//!     .load()?;
//! ```

use std::marker::PhantomData;
#[cfg(feature = "toml-config")]
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use super::error::ConfigResult;
#[cfg(feature = "toml-config")]
use super::error::ConfigError;
use super::schema::LoggingConfig;

/// Environment prefix for logging settings.
pub const LOG_ENV_PREFIX: &str = "PARLEY_LOG_";

/// Layered configuration loader for `T`.
pub struct ConfigLoader<T> {
    /// Programmatic overrides, merged last.
    overrides: Figment,
    /// Environment prefix; `None` skips the environment.
    env_prefix: Option<String>,
    /// Environment key renames, as `(key, field)`.
    env_aliases: Vec<(String, String)>,
    /// Specific config file to load.
    #[cfg(feature = "toml-config")]
    config_file: Option<PathBuf>,
    _config: PhantomData<fn() -> T>,
}

impl<T> Default for ConfigLoader<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ConfigLoader<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Creates a loader that only uses `T::default()`.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            env_prefix: None,
            env_aliases: Vec::new(),
            #[cfg(feature = "toml-config")]
            config_file: None,
            _config: PhantomData,
        }
    }

    /// Reads environment variables starting with `prefix`.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Maps environment keys (prefix stripped) onto fields, as `(key, field)`.
    pub fn env_aliases(mut self, aliases: &[(&str, &str)]) -> Self {
        self.env_aliases.extend(
            aliases
                .iter()
                .map(|(key, field)| (key.to_string(), field.to_string())),
        );
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Sets a TOML configuration file to load.
    #[cfg(feature = "toml-config")]
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides every field with `config`.
    pub fn merge(mut self, config: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single field.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config: ConnectorConfig = ConfigLoader::new()
    ///     .set("use_socket_transport", true)
    ///     .load()?;
    /// ```
    pub fn set<V: Serialize>(mut self, key: &str, value: V) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<T> {
        let figment = self.build_figment()?;
        let config: T = figment.extract()?;
        debug!(config = std::any::type_name::<T>(), "Configuration loaded");
        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(T::default()));

        #[cfg(feature = "toml-config")]
        {
            if let Some(path) = &self.config_file {
                figment = merge_config_file(figment, path)?;
            }
        }

        if let Some(prefix) = &self.env_prefix {
            trace!(prefix = %prefix, "Loading environment variables");
            let aliases = self.env_aliases;
            figment = figment.merge(Env::prefixed(prefix).split("__").map(move |key| {
                aliases
                    .iter()
                    .find(|(from, _)| key.as_str().eq_ignore_ascii_case(from))
                    .map(|(_, field)| field.clone())
                    .unwrap_or_else(|| key.as_str().to_owned())
                    .into()
            }));
        }

        Ok(figment.merge(self.overrides))
    }
}

/// Merges a single config file, dispatching on file extension.
#[cfg(feature = "toml-config")]
fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "toml" => {
            debug!(path = %path.display(), "Loading configuration file");
            Ok(figment.merge(Toml::file(path)))
        }
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Loads logging settings from `PARLEY_LOG_*` and validates them.
pub fn load_logging_config() -> ConfigResult<LoggingConfig> {
    let config: LoggingConfig = ConfigLoader::new().env_prefix(LOG_ENV_PREFIX).load()?;
    config.validate()?;
    Ok(config)
}

// =============================================================================
// Tests
// =============================================================================
