use std::collections::HashMap;

use taskgate_utils::TaskgateError;

use super::{Config, ConfigSource, LoggingConfig, RedactionConfig};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding taskgate and the environment or config files
    /// must not influence the result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use taskgate_config::Config;
    ///
    /// let config = Config::builder()
    ///     .sensitive_field("pin_code")
    ///     .min_secret_length(8)
    ///     .log_format("json")
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.redaction.min_secret_length, Some(8));
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent builder for [`Config`].
///
/// Every value set here is attributed to [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    sensitive_fields: Vec<String>,
    hide_sensitive_fields: Option<bool>,
    min_secret_length: Option<usize>,
    max_depth: Option<usize>,
    adapter: Option<String>,
    skip_words: Option<Vec<String>>,
    extra_patterns: Vec<String>,
    builtin_rules: Option<bool>,
    log_level: Option<String>,
    log_format: Option<String>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field name to the sensitive list.
    #[must_use]
    pub fn sensitive_field(mut self, field: impl Into<String>) -> Self {
        self.sensitive_fields.push(field.into());
        self
    }

    #[must_use]
    pub fn hide_sensitive_fields(mut self, hide: bool) -> Self {
        self.hide_sensitive_fields = Some(hide);
        self
    }

    #[must_use]
    pub fn min_secret_length(mut self, len: usize) -> Self {
        self.min_secret_length = Some(len);
        self
    }

    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = Some(name.into());
        self
    }

    /// Replace the skip-word list.
    #[must_use]
    pub fn skip_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_words = Some(words.into_iter().map(Into::into).collect());
        self
    }

    /// Add a regex applied to every redacted string.
    #[must_use]
    pub fn extra_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn builtin_rules(mut self, enabled: bool) -> Self {
        self.builtin_rules = Some(enabled);
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn log_format(mut self, format: impl Into<String>) -> Self {
        self.log_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails validation.
    pub fn build(self) -> Result<Config, TaskgateError> {
        let mut source_attribution = HashMap::new();
        let mut redaction = RedactionConfig::default();
        let mut logging = LoggingConfig::default();

        let mut set = |key: &str| {
            source_attribution.insert(key.to_string(), ConfigSource::Programmatic);
        };

        if !self.sensitive_fields.is_empty() {
            redaction.sensitive_fields = self.sensitive_fields;
            set("sensitive_fields");
        }
        if self.hide_sensitive_fields.is_some() {
            redaction.hide_sensitive_fields = self.hide_sensitive_fields;
            set("hide_sensitive_fields");
        }
        if self.min_secret_length.is_some() {
            redaction.min_secret_length = self.min_secret_length;
            set("min_secret_length");
        }
        if self.max_depth.is_some() {
            redaction.max_depth = self.max_depth;
            set("max_depth");
        }
        if self.adapter.is_some() {
            redaction.adapter = self.adapter;
            set("adapter");
        }
        if self.skip_words.is_some() {
            redaction.skip_words = self.skip_words;
            set("skip_words");
        }
        if !self.extra_patterns.is_empty() {
            redaction.extra_patterns = self.extra_patterns;
            set("extra_patterns");
        }
        if self.builtin_rules.is_some() {
            redaction.builtin_rules = self.builtin_rules;
            set("builtin_rules");
        }
        if self.log_level.is_some() {
            logging.level = self.log_level;
            set("log_level");
        }
        if self.log_format.is_some() {
            logging.format = self.log_format;
            set("log_format");
        }
        if self.verbose.is_some() {
            logging.verbose = self.verbose;
            set("verbose");
        }

        let config = Config {
            redaction,
            logging,
            config_path: None,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
