use std::fmt;
use std::io;

use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Library-level error type with user-friendly reporting.
///
/// `TaskgateError` is returned by the CLI-facing operations of every taskgate
/// crate. It carries enough detail for programmatic handling, renders a
/// message with context and suggestions through
/// [`display_for_user()`](Self::display_for_user), and maps onto the
/// documented exit codes through [`to_exit_code()`](Self::to_exit_code).
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration errors |
/// | 4 | Run lookup failures |
/// | 65 | Unreadable input or state files |
/// | 1 | Other errors |
///
/// Library code returns `TaskgateError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum TaskgateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid state file {path}: {reason}")]
    StateFile { path: String, reason: String },

    #[error("Invalid input: {0}")]
    Input(String),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    RunLookup,
    FileSystem,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::RunLookup => write!(f, "Run Lookup"),
            Self::FileSystem => write!(f, "File System"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => {
                format!("Configuration file not found: {path}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
            Self::ValidationFailed { errors, .. } => {
                format!(
                    "Configuration validation failed with {} errors: {}",
                    errors.len(),
                    errors.join(", ")
                )
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [redaction] and [logging] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } => Some(
                "taskgate searches for .taskgate/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::DiscoveryFailed { .. } => Some(
                "Configuration discovery searches the directory tree for .taskgate/config.toml files."
                    .to_string(),
            ),
            Self::ValidationFailed { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Remove unknown keys; every section rejects fields it does not define"
                    .to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "min_secret_length" => vec!["Use an integer between 1 and 1024".to_string()],
                "max_depth" => vec!["Use an integer between 1 and 64".to_string()],
                "adapter" => vec!["Use 'url-encode' or 'url-parse'".to_string()],
                "format" | "log_format" => vec!["Use 'compact' or 'json'".to_string()],
                "extra_patterns" => vec![
                    "Check the regex syntax of each extra pattern".to_string(),
                    "Escape literal metacharacters such as '.', '+' and '('".to_string(),
                ],
                "sensitive_fields" => {
                    vec!["Remove blank entries from the sensitive field list".to_string()]
                }
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .taskgate/config.toml in your project root".to_string(),
                "Check the path passed to --config".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check file permissions in the current directory and parent directories"
                    .to_string(),
                "Use --config <path> to specify configuration file explicitly".to_string(),
            ],
            Self::ValidationFailed { .. } => vec![
                "Review the configuration file syntax and structure".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Failures while resolving runs and task instances.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Run {run_id} not found for DAG {dag_id}")]
    RunNotFound { dag_id: String, run_id: String },

    #[error("Backfill {backfill_id} referenced by run {run_id} does not exist")]
    BackfillNotFound { backfill_id: i64, run_id: String },

    #[error("Run metadata unavailable: {0}")]
    Unavailable(String),

    #[error("Run store lock poisoned")]
    Poisoned,
}

impl UserFriendlyError for LookupError {
    fn user_message(&self) -> String {
        match self {
            Self::RunNotFound { dag_id, run_id } => {
                format!("Run '{run_id}' of DAG '{dag_id}' is not in the run store")
            }
            Self::BackfillNotFound {
                backfill_id,
                run_id,
            } => {
                format!("Run '{run_id}' belongs to backfill {backfill_id}, which no longer exists")
            }
            Self::Unavailable(reason) => format!("Run metadata could not be read: {reason}"),
            Self::Poisoned => "The run store was left inconsistent by a panicked writer".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::BackfillNotFound { .. } => Some(
                "The previous run of a backfill run is looked up within the same backfill."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::RunNotFound { .. } => vec![
                "Check the --dag and --run values against the state file".to_string(),
            ],
            Self::BackfillNotFound { .. } => vec![
                "Add the backfill to the 'backfills' list of the state file".to_string(),
                "Clear backfill_id on runs whose backfill was deleted".to_string(),
            ],
            Self::Unavailable(_) | Self::Poisoned => vec!["Retry the evaluation".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::RunLookup
    }
}

impl UserFriendlyError for TaskgateError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Lookup(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
            Self::StateFile { path, reason } => {
                format!("State file {path} could not be loaded: {reason}")
            }
            Self::Input(reason) => format!("Input could not be processed: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Lookup(err) => err.context(),
            Self::Io(_) => None,
            Self::StateFile { .. } => Some(
                "State files are JSON documents with dags, runs, task_instances and backfills."
                    .to_string(),
            ),
            Self::Input(_) => Some("Input documents must be valid JSON.".to_string()),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Lookup(err) => err.suggestions(),
            Self::Io(_) => vec!["Check that the file exists and is readable".to_string()],
            Self::StateFile { .. } => vec![
                "Validate the JSON syntax of the state file".to_string(),
                "Check that timestamps are RFC 3339 and states are lowercase".to_string(),
            ],
            Self::Input(_) => vec!["Validate the JSON syntax of the input".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Lookup(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::StateFile { .. } | Self::Input(_) => ErrorCategory::Validation,
        }
    }
}

impl TaskgateError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    ///
    /// The output passes through the global secrets masker before it is
    /// returned.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        taskgate_redaction::redact_user_string(&output)
    }

    /// Map this error to the appropriate CLI exit code.
    ///
    /// ```rust
    /// use taskgate_utils::error::{LookupError, TaskgateError};
    /// use taskgate_utils::exit_codes::ExitCode;
    ///
    /// let err = TaskgateError::Lookup(LookupError::Poisoned);
    /// assert_eq!(err.to_exit_code(), ExitCode::LOOKUP_FAILED);
    /// ```
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Lookup(_) => ExitCode::LOOKUP_FAILED,
            Self::StateFile { .. } | Self::Input(_) => ExitCode::INPUT_INVALID,
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_error_exit_code_and_category() {
        let err = TaskgateError::Config(ConfigError::InvalidValue {
            key: "max_depth".to_string(),
            value: "0".to_string(),
        });
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(
            err.suggestions()
                .iter()
                .any(|s| s.contains("between 1 and 64"))
        );
    }

    #[test]
    fn test_lookup_error_maps_to_lookup_failed() {
        let err: TaskgateError = LookupError::BackfillNotFound {
            backfill_id: 7,
            run_id: "backfill__2024-01-02".to_string(),
        }
        .into();
        assert_eq!(err.to_exit_code(), ExitCode::LOOKUP_FAILED);
        assert_eq!(err.category().to_string(), "Run Lookup");
        assert!(err.user_message().contains("backfill 7"));
    }

    #[test]
    fn test_input_errors_map_to_input_invalid() {
        let err = TaskgateError::StateFile {
            path: "state.json".to_string(),
            reason: "expected value at line 1".to_string(),
        };
        assert_eq!(err.to_exit_code(), ExitCode::INPUT_INVALID);
        assert_eq!(
            TaskgateError::Input("bad".to_string()).to_exit_code(),
            ExitCode::INPUT_INVALID
        );
    }

    #[test]
    fn test_io_error_is_internal() {
        let err = TaskgateError::Io(io::Error::other("disk on fire"));
        assert_eq!(err.to_exit_code(), ExitCode::INTERNAL);
        assert_eq!(err.category(), ErrorCategory::FileSystem);
    }

    #[test]
    #[serial]
    fn test_display_for_user_layout_and_redaction() {
        taskgate_redaction::reset_secrets_masker();
        taskgate_redaction::secrets_masker().mask_secret("leakedtoken42", None);

        let err = TaskgateError::Input("token leakedtoken42 is malformed".to_string());
        let message = err.display_for_user();

        assert!(message.starts_with("Error: Input could not be processed"));
        assert!(message.contains("\nContext: "));
        assert!(message.contains("Suggestions:\n  • "));
        assert!(!message.contains("leakedtoken42"));
        assert!(message.contains("token *** is malformed"));

        taskgate_redaction::reset_secrets_masker();
    }
}
