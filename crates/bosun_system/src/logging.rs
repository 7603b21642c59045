//! Logging configuration.
//!
//! The entrypoint accepts an optional [`LoggingConfig`] and installs the
//! global `tracing` subscriber at the top of a run. Initialization is
//! idempotent: if a subscriber is already installed (embedding application,
//! tests), the configuration is silently skipped.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

/// Logging configuration for the entrypoint.
///
/// # Example
///
/// ```
/// use bosun_system::logging::{LogFormat, LoggingConfig};
/// use tracing::Level;
///
/// // Development: pretty output with debug level
/// let dev = LoggingConfig::new().with_level(Level::DEBUG);
///
/// // Production: JSON output for log aggregation
/// let prod = LoggingConfig::new()
///     .with_level(Level::INFO)
///     .with_format(LogFormat::Json)
///     .with_env_filter("bosun=info,hyper=warn");
/// ```
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: LogFormat,
    /// Environment filter (e.g., "bosun=debug,hyper=warn").
    env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Installs the global subscriber.
    ///
    /// No-op if a subscriber is already installed.
    pub fn init(&self) {
        let env_filter = match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        };

        // try_init().ok() ignores errors if already initialized
        match self.format {
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .try_init()
                    .ok();
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact())
                    .try_init()
                    .ok();
            }
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .try_init()
                    .ok();
            }
        }
    }
}
