//! Configuration management for taskgate
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Config files are TOML with
//! `[redaction]` and `[logging]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

use std::fmt;
use std::path::PathBuf;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::{
    ENV_HIDE_SENSITIVE_FIELDS, ENV_LOG_FORMAT, ENV_MAX_DEPTH, ENV_SENSITIVE_FIELDS,
};
pub use model::*;

use taskgate_redaction::{MaskerSettings, SensitiveFields, adapter_by_name};
use taskgate_utils::LogFormat;

/// Directory searched for in the working tree and its ancestors.
pub const CONFIG_DIR_NAME: &str = ".taskgate";

/// File name inside [`CONFIG_DIR_NAME`] and the user config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Where a resolved configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile(PathBuf),
    Programmatic,
    Defaults,
}

impl ConfigSource {
    /// Short stable label used in JSON output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::ConfigFile(_) => "config",
            Self::Programmatic => "programmatic",
            Self::Defaults => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::ConfigFile(path) => write!(f, "config file ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

impl Config {
    /// Build masker settings from the `[redaction]` section.
    ///
    /// Assumes the config has been validated; an unknown adapter name
    /// yields no adapter.
    #[must_use]
    pub fn masker_settings(&self) -> MaskerSettings {
        let defaults = MaskerSettings::default();
        let redaction = &self.redaction;
        MaskerSettings {
            sensitive_fields: SensitiveFields::new(&redaction.sensitive_fields)
                .with_hide(redaction.hide_sensitive_fields.unwrap_or(true)),
            min_secret_length: redaction
                .min_secret_length
                .unwrap_or(defaults.min_secret_length),
            max_depth: redaction.max_depth.unwrap_or(defaults.max_depth),
            adapter: redaction.adapter.as_deref().and_then(adapter_by_name),
            skip_words: redaction
                .skip_words
                .clone()
                .unwrap_or(defaults.skip_words),
            extra_patterns: redaction.extra_patterns.clone(),
            builtin_rules: redaction.builtin_rules.unwrap_or(defaults.builtin_rules),
        }
    }

    /// Log format, falling back to compact.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.logging
            .format
            .as_deref()
            .and_then(|format| format.parse().ok())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    /// Source of `key`, or [`ConfigSource::Defaults`] when untracked.
    #[must_use]
    pub fn source_of(&self, key: &str) -> ConfigSource {
        self.source_attribution
            .get(key)
            .cloned()
            .unwrap_or(ConfigSource::Defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display_and_label() {
        let path = PathBuf::from("/tmp/.taskgate/config.toml");
        let file = ConfigSource::ConfigFile(path);
        assert_eq!(file.to_string(), "config file (/tmp/.taskgate/config.toml)");
        assert_eq!(file.label(), "config");
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.label(), "env");
        assert_eq!(ConfigSource::Defaults.label(), "default");
    }

    #[test]
    fn test_masker_settings_from_defaults() {
        let config = Config::builder().build().unwrap();
        let settings = config.masker_settings();
        assert_eq!(settings.min_secret_length, 5);
        assert_eq!(settings.max_depth, 5);
        assert!(settings.adapter.is_none());
        assert!(settings.sensitive_fields.hides());
        assert!(settings.sensitive_fields.should_hide("password"));
        assert!(!settings.builtin_rules);
    }

    #[test]
    fn test_masker_settings_carry_overrides() {
        let config = Config::builder()
            .sensitive_field("pin_code")
            .hide_sensitive_fields(false)
            .adapter("url-encode")
            .max_depth(8)
            .build()
            .unwrap();
        let settings = config.masker_settings();
        assert_eq!(settings.max_depth, 8);
        assert!(settings.adapter.is_some());
        assert!(!settings.sensitive_fields.hides());
        assert!(
            settings
                .sensitive_fields
                .fields()
                .iter()
                .any(|f| f == "pin_code")
        );
    }

    #[test]
    fn test_log_format_fallback() {
        let config = Config::builder().log_format("json").build().unwrap();
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.source_of("log_format"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("max_depth"), ConfigSource::Defaults);
    }
}
