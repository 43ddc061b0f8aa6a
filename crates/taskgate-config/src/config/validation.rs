use regex::Regex;
use taskgate_redaction::ADAPTER_NAMES;
use taskgate_utils::{ConfigError, LOG_LEVELS, LogFormat, TaskgateError};

use super::Config;

const MAX_SECRET_LENGTH_LIMIT: usize = 1024;
const MAX_DEPTH_LIMIT: usize = 64;

fn invalid(key: &str, value: impl Into<String>) -> TaskgateError {
    TaskgateError::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    })
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), TaskgateError> {
        let redaction = &self.redaction;

        if let Some(len) = redaction.min_secret_length
            && !(1..=MAX_SECRET_LENGTH_LIMIT).contains(&len)
        {
            return Err(invalid(
                "min_secret_length",
                format!("must be between 1 and {MAX_SECRET_LENGTH_LIMIT}"),
            ));
        }

        if let Some(depth) = redaction.max_depth
            && !(1..=MAX_DEPTH_LIMIT).contains(&depth)
        {
            return Err(invalid(
                "max_depth",
                format!("must be between 1 and {MAX_DEPTH_LIMIT}"),
            ));
        }

        if let Some(adapter) = &redaction.adapter
            && !ADAPTER_NAMES.contains(&adapter.as_str())
        {
            return Err(invalid(
                "adapter",
                format!(
                    "unknown adapter '{adapter}' (expected one of: {})",
                    ADAPTER_NAMES.join(", ")
                ),
            ));
        }

        if redaction.sensitive_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(invalid("sensitive_fields", "entries must not be blank"));
        }

        let mut errors = Vec::new();
        for (idx, pattern) in redaction.extra_patterns.iter().enumerate() {
            if pattern.is_empty() {
                errors.push(format!("extra_patterns[{idx}]: empty pattern"));
            } else if let Err(e) = Regex::new(pattern) {
                errors.push(format!("extra_patterns[{idx}]: {e}"));
            }
        }
        if !errors.is_empty() {
            let error_count = errors.len();
            return Err(TaskgateError::Config(ConfigError::ValidationFailed {
                errors,
                error_count,
            }));
        }

        if let Some(format) = &self.logging.format {
            format
                .parse::<LogFormat>()
                .map_err(|reason| invalid("log_format", reason))?;
        }

        if let Some(level) = &self.logging.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            return Err(invalid(
                "log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}
