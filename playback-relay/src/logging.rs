//! Logging setup for the relay binary.
//!
//! Log output goes to stderr so stdout stays clean for command output such
//! as `devices --json`.

use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable that overrides every other log level source.
pub const LOG_LEVEL_ENV: &str = "RELAY_LOG_LEVEL";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Multi-line output with source locations
    Pretty,
    /// Newline-delimited JSON for log collectors
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Install the global subscriber.
///
/// The filter comes from `RELAY_LOG_LEVEL`, then `RUST_LOG`, then
/// `default_level`.
pub fn init_logging(format: LogFormat, default_level: &str) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = create_env_filter(default_level)?;

    let result = match format {
        LogFormat::Compact => Registry::default()
            .with(fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact())
            .with(filter)
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(fmt::layer()
                .with_writer(std::io::stderr)
                .pretty()
                .with_file(true)
                .with_line_number(true))
            .with(filter)
            .try_init(),
        LogFormat::Json => Registry::default()
            .with(fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false))
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

fn create_env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directives = resolve_directives(
        std::env::var(LOG_LEVEL_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        default_level,
    );

    EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter {
        filter: directives.clone(),
        reason: e.to_string(),
    })
}

/// Pick the filter directives. A bare CLI level also quiets the AWS SDK,
/// which is chatty at `info`.
fn resolve_directives(relay_level: Option<String>, rust_log: Option<String>, default_level: &str) -> String {
    relay_level
        .filter(|level| !level.trim().is_empty())
        .or_else(|| rust_log.filter(|level| !level.trim().is_empty()))
        .unwrap_or_else(|| format!("{},aws_config=warn,aws_smithy_runtime=warn", default_level))
}
