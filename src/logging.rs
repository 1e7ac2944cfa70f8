// Structured logging setup for hookenv
use std::io::{self, IsTerminal};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{CliError, HookEnvError, Result};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format
    pub format: LogFormat,
    /// Color output configuration
    pub color: ColorConfig,
    /// Whether to show targets (module names)
    pub show_targets: bool,
}

/// Log output format options
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human readable output for terminals
    Pretty,
    /// JSON lines for log collectors
    Json,
    /// Single-line output
    Compact,
}

/// Color output configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ColorConfig {
    Auto,
    Always,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Pretty,
            color: ColorConfig::Auto,
            show_targets: false,
        }
    }
}

impl LogConfig {
    /// Create logging configuration from CLI arguments
    pub fn from_cli(verbose: bool, quiet: bool, color: Option<String>) -> Self {
        let level = if quiet {
            Level::ERROR
        } else if verbose {
            Level::DEBUG
        } else {
            Level::WARN
        };

        let color = match color.as_deref() {
            Some("always") => ColorConfig::Always,
            Some("never") => ColorConfig::Never,
            _ => ColorConfig::Auto,
        };

        Self {
            level,
            color,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Check if colors should be used based on configuration and terminal
    pub fn should_use_colors(&self) -> bool {
        match self.color {
            ColorConfig::Always => true,
            ColorConfig::Never => false,
            ColorConfig::Auto => {
                io::stderr().is_terminal()
                    && std::env::var("TERM").map_or(true, |term| term != "dumb")
                    && std::env::var("NO_COLOR").is_err()
            }
        }
    }

    /// Filter rooted at the crate target; `RUST_LOG` wins when set
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("hookenv={}", self.level)))
    }
}

/// Initialize the global subscriber. Logs go to stderr so stdout stays scriptable.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = config.env_filter();
    let ansi = config.should_use_colors();

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_target(config.show_targets);

    let outcome = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    outcome.map_err(|e| {
        HookEnvError::Cli(Box::new(CliError::RuntimeError {
            message: format!("failed to initialize logging: {e}"),
        }))
    })
}

/// Spans shared by the cache operations
pub mod spans {
    use std::path::Path;
    use tracing::{span, Level, Span};

    /// Span covering one `resolve` request
    pub fn resolve_span(repo: &str, rev: &str, language: &str) -> Span {
        span!(Level::INFO, "resolve", repo = %repo, rev = %rev, language = %language)
    }

    /// Span covering a repository clone and checkout
    pub fn repo_clone_span(repo: &str, rev: &str, path: &Path) -> Span {
        span!(Level::DEBUG, "repo_clone", repo = %repo, rev = %rev, path = %path.display())
    }

    /// Span covering one environment materialization
    pub fn environment_setup_span(language: &str, env_path: &Path) -> Span {
        span!(
            Level::INFO,
            "environment_setup",
            language = %language,
            env_path = %env_path.display()
        )
    }
}
