//! Tracing subscriber installation.
//!
//! A single entry point installs an `EnvFilter` plus one fmt layer (pretty or
//! JSON). `RUST_LOG`, when set, wins over the level derived from `--verbose`.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when neither `RUST_LOG` nor verbose mode is set.
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Level used in verbose mode.
pub const VERBOSE_LOG_LEVEL: &str = "debug";
/// Environment variable selecting the log format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "IZ_LOG_FORMAT";

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig<'a> {
    /// Filter directive used when `RUST_LOG` is absent.
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig<'_> {
    /// Configuration for a CLI run.
    #[must_use]
    pub fn for_cli(verbose: bool, format: Option<&str>) -> Self {
        Self {
            level: if verbose {
                VERBOSE_LOG_LEVEL
            } else {
                DEFAULT_LOG_LEVEL
            },
            format: LogFormat::parse(format),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Map an `IZ_LOG_FORMAT` value; anything but `json` is pretty.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install the global subscriber once per process.
///
/// Returns `false` when a subscriber installed by an earlier call is kept.
///
/// # Errors
///
/// Returns an error if another subscriber was installed outside this crate.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    if INSTALLED.get().is_some() {
        return Ok(false);
    }
    install(config)?;
    INSTALLED.set(config.format).ok();
    Ok(true)
}

fn install(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config.level);
    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .try_init(),
    }
    .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
