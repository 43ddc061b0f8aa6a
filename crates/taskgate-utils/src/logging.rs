//! Tracing setup for the taskgate binary.
//!
//! All output goes to stderr through [`RedactedWriter`], so any secret
//! registered with the global masker is replaced before it reaches a log line.

use std::fmt;
use std::io::{self, IsTerminal};
use std::str::FromStr;

use anyhow::Result;
use taskgate_redaction::RedactedWriter;
use tracing::{Level, span};
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one line per event
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub const VALUES: &'static [&'static str] = &["compact", "json"];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{other}' (expected one of: {})",
                Self::VALUES.join(", ")
            )),
        }
    }
}

/// Color only when stderr is a terminal and NO_COLOR is unset.
fn use_color() -> bool {
    io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn redacted_stderr() -> RedactedWriter<'static, io::Stderr> {
    RedactedWriter::global(io::stderr())
}

/// Levels accepted for `[logging] level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn default_directives(verbose: bool, level: Option<&str>) -> String {
    match level {
        Some(level) => format!("taskgate={level},warn"),
        None if verbose => "taskgate=debug,info".to_string(),
        None => "taskgate=info,warn".to_string(),
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise a configured `level` applies to
/// taskgate's own targets, falling back to `taskgate=info,warn`, or
/// `taskgate=debug,info` when `verbose` is set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat, level: Option<&str>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose, level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tfmt::layer()
                        .json()
                        .with_target(verbose)
                        .with_current_span(true)
                        .with_writer(redacted_stderr),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tfmt::layer()
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_line_number(false)
                        .with_file(false)
                        .with_ansi(use_color())
                        .with_writer(redacted_stderr)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span wrapping one dependency evaluation.
pub fn dep_span(dag_id: &str, task_id: &str, run_id: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "dep_evaluation",
        dag_id = %dag_id,
        task_id = %task_id,
        run_id = %run_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        let err = "yaml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("compact, json"));
    }

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(false, None), "taskgate=info,warn");
        assert_eq!(default_directives(true, None), "taskgate=debug,info");
        assert_eq!(default_directives(true, Some("trace")), "taskgate=trace,warn");
    }

    #[test]
    fn test_log_format_display_round_trips() {
        for value in LogFormat::VALUES {
            let format: LogFormat = value.parse().unwrap();
            assert_eq!(format.to_string(), *value);
        }
        assert_eq!(LogFormat::default(), LogFormat::Compact);
    }
}
