use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use taskgate_redaction::masker::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_SECRET_LENGTH, DEFAULT_SKIP_WORDS};

use super::ConfigSource;

/// Resolved taskgate configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub redaction: RedactionConfig,
    pub logging: LoggingConfig,
    /// File the values were loaded from, if any.
    pub config_path: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[redaction]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedactionConfig {
    /// Field names added to the built-in sensitive list.
    #[serde(default)]
    pub sensitive_fields: Vec<String>,
    pub hide_sensitive_fields: Option<bool>,
    pub min_secret_length: Option<usize>,
    pub max_depth: Option<usize>,
    /// Name of a secret adapter (`url-encode` or `url-parse`).
    pub adapter: Option<String>,
    pub skip_words: Option<Vec<String>>,
    #[serde(default)]
    pub extra_patterns: Vec<String>,
    pub builtin_rules: Option<bool>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: Vec::new(),
            hide_sensitive_fields: Some(true),
            min_secret_length: Some(DEFAULT_MIN_SECRET_LENGTH),
            max_depth: Some(DEFAULT_MAX_DEPTH),
            adapter: None,
            skip_words: Some(DEFAULT_SKIP_WORDS.iter().map(ToString::to_string).collect()),
            extra_patterns: Vec::new(),
            builtin_rules: Some(false),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for taskgate's own targets. `RUST_LOG` still wins.
    pub level: Option<String>,
    /// `compact` or `json`.
    pub format: Option<String>,
    pub verbose: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: Some("compact".to_string()),
            verbose: Some(false),
        }
    }
}
