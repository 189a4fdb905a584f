//! Tracing and observability plugin.
//!
//! Provides [`TracingPlugin`], which installs a `tracing` subscriber and
//! exposes its settings as the [`TracingConfig`] global resource.
//!
//! # Lifecycle
//!
//! - **`build()`** registers [`TracingConfig`] so other plugins can read the
//!   intended configuration.
//! - **`ready()`** installs the subscriber. Installation uses `try_init`, so a
//!   second server in the same process (common in tests) keeps the first
//!   subscriber.
//!
//! Output goes to stderr by default: the console protocol may own stdout.

use core::str::FromStr;

use crate::ServerInfoPlugin;
use portico_system::plugin::{Plugin, PluginId};
use portico_system::resource::GlobalResource;
use portico_system::server::Server;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown tracing format '{other}'")),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutput {
    /// Standard error (default).
    #[default]
    Stderr,
    /// Standard output.
    Stdout,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig Resource
// ─────────────────────────────────────────────────────────────────────────────

/// Effective tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum log level used when no filter directive applies.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    /// Target-specific filter directives, if any.
    pub env_filter: Option<String>,
    /// Output stream.
    pub output: TracingOutput,
}

impl GlobalResource for TracingConfig {}

impl TracingConfig {
    /// Builds the [`EnvFilter`], falling back to `level` when the directive
    /// string does not parse.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Installs the `tracing` subscriber.
///
/// # Example
///
/// ```
/// use portico_core_plugins::{TracingFormat, TracingPlugin};
/// use tracing::Level;
///
/// // Local debugging
/// let dev = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// // Production: JSON for aggregation, quiet dependencies
/// let prod = TracingPlugin::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("portico=info,portico_console=debug");
/// ```
#[derive(Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    output: TracingOutput,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            output: TracingOutput::Stderr,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a `TracingPlugin` with default settings.
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
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets filter directives, format `target=level,target=level`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Sets the output stream.
    #[must_use]
    pub fn with_output(mut self, output: TracingOutput) -> Self {
        self.output = output;
        self
    }

    /// Enables span enter/exit events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
            env_filter: self.env_filter.clone(),
            output: self.output,
        }
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, server: &mut Server) {
        server.insert_global(self.config());
    }

    fn ready(&self, server: &mut Server) {
        let config = server
            .get_global::<TracingConfig>()
            .cloned()
            .unwrap_or_else(|| self.config());

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let base = tracing_subscriber::fmt::layer().with_span_events(span_events);
        let layer = match (config.format, config.output) {
            (TracingFormat::Pretty, TracingOutput::Stderr) => {
                base.pretty().with_writer(std::io::stderr).boxed()
            }
            (TracingFormat::Pretty, TracingOutput::Stdout) => {
                base.pretty().with_writer(std::io::stdout).boxed()
            }
            (TracingFormat::Compact, TracingOutput::Stderr) => {
                base.compact().with_writer(std::io::stderr).boxed()
            }
            (TracingFormat::Compact, TracingOutput::Stdout) => {
                base.compact().with_writer(std::io::stdout).boxed()
            }
            (TracingFormat::Json, TracingOutput::Stderr) => {
                base.json().with_writer(std::io::stderr).boxed()
            }
            (TracingFormat::Json, TracingOutput::Stdout) => {
                base.json().with_writer(std::io::stdout).boxed()
            }
        };

        let installed = tracing_subscriber::registry()
            .with(config.filter())
            .with(layer)
            .try_init()
            .is_ok();

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            installed,
            "tracing configured"
        );
    }

    fn dependencies(&self) -> Vec<PluginId> {
        vec![PluginId::of::<ServerInfoPlugin>()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let plugin = TracingPlugin::default();
        assert_eq!(plugin.level, Level::INFO);
        assert_eq!(plugin.format, TracingFormat::Pretty);
        assert_eq!(plugin.output, TracingOutput::Stderr);
        assert!(!plugin.span_events);
    }

    #[test]
    fn builder_methods() {
        let plugin = TracingPlugin::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("portico_console=trace")
            .with_output(TracingOutput::Stdout)
            .with_span_events(true);

        let config = plugin.config();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.env_filter.as_deref(), Some("portico_console=trace"));
        assert_eq!(config.output, TracingOutput::Stdout);
        assert!(plugin.span_events);
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<TracingFormat>(), Ok(TracingFormat::Json));
        assert_eq!(" compact ".parse::<TracingFormat>(), Ok(TracingFormat::Compact));
        assert!("xml".parse::<TracingFormat>().is_err());
    }

    #[test]
    fn invalid_filter_falls_back_to_level() {
        let config = TracingPlugin::new()
            .with_level(Level::WARN)
            .with_env_filter("[[not a filter")
            .config();
        assert_eq!(config.filter().to_string(), "warn");
    }

    #[test]
    fn registers_config_resource() {
        let mut server = Server::new();
        server.add_plugins(ServerInfoPlugin::default());
        server.add_plugins(TracingPlugin::default().with_format(TracingFormat::Compact));
        server.finish();

        let config = server.get_global::<TracingConfig>().unwrap();
        assert_eq!(config.format, TracingFormat::Compact);
    }
}
