//! Logging setup for Parley.
//!
//! Installs a `tracing-subscriber` registry built from a [`LoggingConfig`]:
//! one fmt layer (compact, full, pretty or json) writing to stdout, stderr or
//! a file, behind an `EnvFilter`. `RUST_LOG`, when set, replaces the configured
//! base level; module filters from the config are added on top either way.
//!
//! ```rust,ignore
//! use parley_runtime::config::load_logging_config;
//! use parley_runtime::logging;
//!
//! logging::init_from_config(&load_logging_config()?);
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize logging from a `LoggingConfig`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Subscriber settings resolved from a [`LoggingConfig`].
pub struct LoggingBuilder {
    base_level: tracing::Level,
    directives: Vec<String>,
    span_events: FmtSpan,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    file_location: bool,
    file_path: Option<PathBuf>,
}

impl LoggingBuilder {
    /// Resolves the subscriber settings for `config`.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            base_level: config.level.to_tracing_level(),
            directives: config
                .filters
                .iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            span_events: fmt_span(&config.span_events),
            format: config.format,
            output: config.output,
            thread_ids: config.thread_ids,
            file_location: config.file_location,
            file_path: config.file_path.clone(),
        }
    }

    /// Installs the subscriber, ignoring the error if one is already set.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber as the global default.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.filter();

        let mut missing_file = false;
        let layer = match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => self.layer(std::io::stdout),
            (LogOutput::Stderr, _) => self.layer(std::io::stderr),
            (LogOutput::File, Some(path)) => self.layer(file_writer(path)),
            (LogOutput::File, None) => {
                missing_file = true;
                self.layer(std::io::stdout)
            }
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init()?;

        if missing_file {
            warn!("File output requested but no file path configured, using stdout");
        }
        Ok(())
    }

    fn filter(&self) -> EnvFilter {
        let base = self.base_level.as_str().to_ascii_lowercase();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));

        self.directives
            .iter()
            .filter_map(|directive| directive.parse().ok())
            .fold(filter, EnvFilter::add_directive)
    }

    fn layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.span_events.clone())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            // Without `json-log`, json falls back to the full format.
            _ => layer.boxed(),
        }
    }
}

fn file_writer(path: &Path) -> tracing_appender::rolling::RollingFileAppender {
    tracing_appender::rolling::never(
        path.parent().unwrap_or_else(|| Path::new(".")),
        path.file_name().unwrap_or_else(|| OsStr::new("parley.log")),
    )
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            thread_ids: true,
            file_location: true,
            span_events: SpanEventConfig {
                new: true,
                close: true,
                ..Default::default()
            },
            ..Default::default()
        };
        config
            .filters
            .insert("parley_transport".to_string(), LogLevel::Trace);
        config
            .filters
            .insert("parley_core".to_string(), LogLevel::Warn);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.base_level, tracing::Level::DEBUG);
        assert_eq!(
            builder.directives,
            vec!["parley_core=warn", "parley_transport=trace"]
        );
        assert_eq!(builder.span_events, FmtSpan::NEW | FmtSpan::CLOSE);
        assert!(builder.thread_ids);
        assert!(builder.file_location);
    }

    #[test]
    fn test_fmt_span() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
        let all = SpanEventConfig {
            new: true,
            enter: true,
            exit: true,
            close: true,
        };
        assert_eq!(fmt_span(&all), FmtSpan::FULL);
    }

    #[test]
    fn test_default_level_is_info() {
        let builder = LoggingBuilder::from_config(&LoggingConfig::default());
        assert_eq!(builder.base_level, tracing::Level::INFO);
        assert!(builder.directives.is_empty());
    }
}
