//! Configuration types for the Botkit connector.
//!
//! The recognized options mirror the Botkit capabilities a test harness
//! usually sets through the environment:
//!
//! | Environment | Field | Meaning |
//! |-------------|-------|---------|
//! | `BOTKIT_SERVER_URL` | `server_url` | Base URL of the Botkit server (required) |
//! | `BOTKIT_WEBSOCKET` | `use_socket_transport` | WebSocket instead of webhook |
//! | `BOTKIT_USERID` | `fixed_user_id` | Fixed session user id |
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ConnectorConfig::new("ws://127.0.0.1:3000")
//!     .socket(true)
//!     .fixed_user_id("tester-1");
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable prefix for connector options.
pub const ENV_PREFIX: &str = "BOTKIT_";

/// Environment keys (prefix stripped, lowercased) that differ from field names.
pub const ENV_ALIASES: &[(&str, &str)] = &[
    ("websocket", "use_socket_transport"),
    ("userid", "fixed_user_id"),
];

/// Botkit connector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Base URL of the Botkit server.
    pub server_url: Option<String>,

    /// Use the WebSocket transport instead of the webhook.
    #[serde(deserialize_with = "lenient_bool")]
    pub use_socket_transport: bool,

    /// Session user id; a random one is generated when absent.
    #[serde(deserialize_with = "lenient_string")]
    pub fixed_user_id: Option<String>,

    /// Webhook receive path, appended to `server_url`.
    pub receive_path: String,

    /// How long `validate` waits for the channel to open, in milliseconds.
    pub open_timeout_ms: u64,

    /// Webhook request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            use_socket_transport: false,
            fixed_user_id: None,
            receive_path: "/botkit/receive".to_string(),
            open_timeout_ms: 10_000,
            request_timeout_secs: 30,
        }
    }
}

impl ConnectorConfig {
    /// Creates a webhook configuration for `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: Some(server_url.into()),
            ..Default::default()
        }
    }

    /// Selects the WebSocket transport.
    pub fn socket(mut self, enabled: bool) -> Self {
        self.use_socket_transport = enabled;
        self
    }

    /// Sets a fixed session user id.
    pub fn fixed_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.fixed_user_id = Some(user_id.into());
        self
    }

    /// Sets the webhook receive path.
    pub fn receive_path(mut self, path: impl Into<String>) -> Self {
        self.receive_path = path.into();
        self
    }

    /// Sets the channel open timeout.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the server URL, if set and not blank.
    pub fn server_url(&self) -> Option<&str> {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Returns the fixed user id, if set and not blank.
    pub fn user_id(&self) -> Option<&str> {
        self.fixed_user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// Returns the channel open timeout.
    pub fn open_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    /// Returns the webhook request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A scalar as environment parsing may produce it.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Flag(bool),
}

/// Accepts a string, or a scalar that environment parsing turned into one.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(s) => s,
        Scalar::Signed(n) => n.to_string(),
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    }))
}

/// Accepts a bool, a number (non-zero is true) or a string.
///
/// Blank, `0`, `false`, `no` and `off` read as false; any other string is true.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Flag(b) => b,
        Scalar::Signed(n) => n != 0,
        Scalar::Unsigned(n) => n != 0,
        Scalar::Float(n) => n != 0.0,
        Scalar::Text(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use parley_runtime::config::ConfigLoader;
    use serde_json::json;

    fn load_from_env() -> ConnectorConfig {
        ConfigLoader::<ConnectorConfig>::new()
            .env_prefix(ENV_PREFIX)
            .env_aliases(ENV_ALIASES)
            .load()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.server_url(), None);
        assert!(!config.use_socket_transport);
        assert_eq!(config.receive_path, "/botkit/receive");
        assert_eq!(config.open_timeout_duration(), Duration::from_secs(10));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let config = ConnectorConfig::new("   ").fixed_user_id("");
        assert_eq!(config.server_url(), None);
        assert_eq!(config.user_id(), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ConnectorConfig = serde_json::from_value(json!({
            "server_url": "http://localhost:3000",
            "use_socket_transport": true,
            "fixed_user_id": 1234
        }))
        .unwrap();
        assert_eq!(config.server_url(), Some("http://localhost:3000"));
        assert!(config.use_socket_transport);
        assert_eq!(config.user_id(), Some("1234"));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_botkit_env() {
        Jail::expect_with(|jail| {
            jail.set_env("BOTKIT_SERVER_URL", "http://bot:3000");
            jail.set_env("BOTKIT_WEBSOCKET", "true");
            jail.set_env("BOTKIT_USERID", "1234");

            let config = load_from_env();
            assert_eq!(config.server_url(), Some("http://bot:3000"));
            assert!(config.use_socket_transport);
            assert_eq!(config.user_id(), Some("1234"));
            assert_eq!(config.receive_path, "/botkit/receive");
            Ok(())
        });
    }

    #[test]
    fn test_websocket_flag_spellings() {
        for (value, expected) in [
            ("1", true),
            ("0", false),
            ("yes", true),
            ("off", false),
            ("FALSE", false),
        ] {
            Jail::expect_with(|jail| {
                jail.set_env("BOTKIT_SERVER_URL", "ws://bot:3000");
                jail.set_env("BOTKIT_WEBSOCKET", value);

                let config = load_from_env();
                assert_eq!(
                    config.use_socket_transport, expected,
                    "BOTKIT_WEBSOCKET={value:?}"
                );
                Ok(())
            });
        }
    }

    #[test]
    fn test_deserialize_numeric_flag() {
        let config: ConnectorConfig =
            serde_json::from_value(json!({"use_socket_transport": 1})).unwrap();
        assert!(config.use_socket_transport);
        let config: ConnectorConfig =
            serde_json::from_value(json!({"use_socket_transport": "no"})).unwrap();
        assert!(!config.use_socket_transport);
    }
}
