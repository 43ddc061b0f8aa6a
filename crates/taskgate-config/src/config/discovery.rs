use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use taskgate_utils::{ConfigError, TaskgateError};
use tracing::debug;

use super::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, Config, ConfigSource, LoggingConfig,
    RedactionConfig,
};

pub const ENV_SENSITIVE_FIELDS: &str = "TASKGATE_SENSITIVE_FIELDS";
pub const ENV_HIDE_SENSITIVE_FIELDS: &str = "TASKGATE_HIDE_SENSITIVE_FIELDS";
pub const ENV_LOG_FORMAT: &str = "TASKGATE_LOG_FORMAT";
pub const ENV_MAX_DEPTH: &str = "TASKGATE_MAX_DEPTH";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    redaction: Option<RedactionConfig>,
    logging: Option<LoggingConfig>,
}

/// Values a layer may contribute. `None` leaves the lower layer in place.
#[derive(Debug, Default)]
struct Layer {
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

impl Layer {
    fn from_file(file: TomlConfig) -> Self {
        let redaction = file.redaction.unwrap_or_else(empty_redaction);
        let logging = file.logging.unwrap_or(LoggingConfig {
            level: None,
            format: None,
            verbose: None,
        });
        Self {
            sensitive_fields: redaction.sensitive_fields,
            hide_sensitive_fields: redaction.hide_sensitive_fields,
            min_secret_length: redaction.min_secret_length,
            max_depth: redaction.max_depth,
            adapter: redaction.adapter,
            skip_words: redaction.skip_words,
            extra_patterns: redaction.extra_patterns,
            builtin_rules: redaction.builtin_rules,
            log_level: logging.level,
            log_format: logging.format,
            verbose: logging.verbose,
        }
    }

    fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TaskgateError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut layer = Self::default();

        if let Some(fields) = get(ENV_SENSITIVE_FIELDS) {
            layer.sensitive_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(hide) = get(ENV_HIDE_SENSITIVE_FIELDS) {
            layer.hide_sensitive_fields = Some(parse_bool(ENV_HIDE_SENSITIVE_FIELDS, &hide)?);
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            layer.log_format = Some(format);
        }
        if let Some(depth) = get(ENV_MAX_DEPTH) {
            let depth = depth.trim().parse::<usize>().map_err(|_| {
                TaskgateError::Config(ConfigError::InvalidValue {
                    key: ENV_MAX_DEPTH.to_string(),
                    value: format!("'{depth}' is not a non-negative integer"),
                })
            })?;
            layer.max_depth = Some(depth);
        }
        Ok(layer)
    }

    fn from_cli(cli: &CliArgs) -> Self {
        Self {
            sensitive_fields: cli.sensitive_fields.clone(),
            hide_sensitive_fields: None,
            min_secret_length: cli.min_secret_length,
            max_depth: cli.max_depth,
            adapter: cli.adapter.clone(),
            skip_words: None,
            extra_patterns: cli.extra_patterns.clone(),
            builtin_rules: cli.builtin_rules,
            log_level: None,
            log_format: cli.log_format.clone(),
            verbose: cli.verbose,
        }
    }

    /// Overlay this layer onto `config`, recording `source` for every key it sets.
    ///
    /// List-valued keys (`sensitive_fields`, `extra_patterns`) accumulate
    /// across layers; everything else is replaced.
    fn apply(
        self,
        source: &ConfigSource,
        redaction: &mut RedactionConfig,
        logging: &mut LoggingConfig,
        attribution: &mut HashMap<String, ConfigSource>,
    ) {
        let mut mark = |key: &str| {
            attribution.insert(key.to_string(), source.clone());
        };

        if !self.sensitive_fields.is_empty() {
            redaction.sensitive_fields.extend(self.sensitive_fields);
            mark("sensitive_fields");
        }
        if self.hide_sensitive_fields.is_some() {
            redaction.hide_sensitive_fields = self.hide_sensitive_fields;
            mark("hide_sensitive_fields");
        }
        if self.min_secret_length.is_some() {
            redaction.min_secret_length = self.min_secret_length;
            mark("min_secret_length");
        }
        if self.max_depth.is_some() {
            redaction.max_depth = self.max_depth;
            mark("max_depth");
        }
        if self.adapter.is_some() {
            redaction.adapter = self.adapter;
            mark("adapter");
        }
        if self.skip_words.is_some() {
            redaction.skip_words = self.skip_words;
            mark("skip_words");
        }
        if !self.extra_patterns.is_empty() {
            redaction.extra_patterns.extend(self.extra_patterns);
            mark("extra_patterns");
        }
        if self.builtin_rules.is_some() {
            redaction.builtin_rules = self.builtin_rules;
            mark("builtin_rules");
        }
        if self.log_level.is_some() {
            logging.level = self.log_level;
            mark("log_level");
        }
        if self.log_format.is_some() {
            logging.format = self.log_format;
            mark("log_format");
        }
        if self.verbose.is_some() {
            logging.verbose = self.verbose;
            mark("verbose");
        }
    }
}

fn empty_redaction() -> RedactionConfig {
    RedactionConfig {
        sensitive_fields: Vec::new(),
        hide_sensitive_fields: None,
        min_secret_length: None,
        max_depth: None,
        adapter: None,
        skip_words: None,
        extra_patterns: Vec::new(),
        builtin_rules: None,
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, TaskgateError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TaskgateError::Config(ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("'{raw}' is not a boolean"),
        })),
    }
}

impl Config {
    /// Discover and load configuration with precedence:
    /// CLI > environment > config file > defaults.
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, an
    /// environment override is malformed, or validation fails.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, TaskgateError> {
        let start_dir = env::current_dir().map_err(|e| {
            TaskgateError::Config(ConfigError::DiscoveryFailed {
                reason: format!("cannot determine current directory: {e}"),
            })
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, TaskgateError> {
        Self::discover_with_env(start_dir, cli_args, |key| env::var(key).ok())
    }

    /// Path-and-environment-driven variant used by tests to avoid process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_with_env(
        start_dir: &Path,
        cli_args: &CliArgs,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, TaskgateError> {
        let mut source_attribution = HashMap::new();
        let mut redaction = RedactionConfig::default();
        let mut logging = LoggingConfig::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(TaskgateError::Config(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }));
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir).or_else(Self::user_config_file),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "loading config file");
            let file_config = Self::load_config_file(path)?;
            Layer::from_file(file_config).apply(
                &ConfigSource::ConfigFile(path.clone()),
                &mut redaction,
                &mut logging,
                &mut source_attribution,
            );
        }

        Layer::from_env(env_lookup)?.apply(
            &ConfigSource::Env,
            &mut redaction,
            &mut logging,
            &mut source_attribution,
        );

        Layer::from_cli(cli_args).apply(
            &ConfigSource::Cli,
            &mut redaction,
            &mut logging,
            &mut source_attribution,
        );

        let config = Self {
            redaction,
            logging,
            config_path,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }

    /// Search upward from `start_dir` for `.taskgate/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root
    /// (`.git`, `.hg`, `.svn`).
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current = dir.parent();
        }

        None
    }

    /// `<user config dir>/taskgate/config.toml`, if it exists.
    #[must_use]
    pub fn user_config_file() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join("taskgate").join(CONFIG_FILE_NAME);
        path.is_file().then_some(path)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig, TaskgateError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            TaskgateError::Config(ConfigError::InvalidFile(format!(
                "{}: {}",
                path.display(),
                e.message()
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_discovery_walks_up_to_repo_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join(".git")).unwrap();
        let expected = write_config(root, "[redaction]\nmax_depth = 7\n");
        let nested = root.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_config_file_from(&nested), Some(expected));
    }

    #[test]
    fn test_discovery_stops_at_repo_root() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "");
        let repo = temp.path().join("repo");
        fs::create_dir_all(repo.join(".git")).unwrap();

        assert_eq!(Config::discover_config_file_from(&repo), None);
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let path = write_config(
            temp.path(),
            "[redaction]\nmax_depth = 7\nmin_secret_length = 6\nsensitive_fields = [\"pin\"]\n\n[logging]\nformat = \"json\"\n",
        );

        let env = |key: &str| match key {
            ENV_MAX_DEPTH => Some("9".to_string()),
            ENV_SENSITIVE_FIELDS => Some("cvv, iban".to_string()),
            _ => None,
        };
        let cli = CliArgs {
            min_secret_length: Some(8),
            ..CliArgs::default()
        };

        let config = Config::discover_with_env(temp.path(), &cli, env).unwrap();
        assert_eq!(config.config_path, Some(path.clone()));
        assert_eq!(config.redaction.min_secret_length, Some(8));
        assert_eq!(config.source_of("min_secret_length"), ConfigSource::Cli);
        assert_eq!(config.redaction.max_depth, Some(9));
        assert_eq!(config.source_of("max_depth"), ConfigSource::Env);
        assert_eq!(config.log_format(), taskgate_utils::LogFormat::Json);
        assert_eq!(config.source_of("log_format"), ConfigSource::ConfigFile(path));
        assert_eq!(config.redaction.sensitive_fields, vec!["pin", "cvv", "iban"]);
        assert_eq!(config.source_of("sensitive_fields"), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[redaction\nmax_depth = ");

        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();
        assert!(matches!(
            err,
            TaskgateError::Config(ConfigError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[redaction]\nmax_dept = 3\n");

        assert!(Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("missing.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_with_env(temp.path(), &cli, no_env).unwrap_err();
        assert!(matches!(
            err,
            TaskgateError::Config(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_env_values() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(write_config(temp.path(), "")),
            ..CliArgs::default()
        };

        let bad_depth = |key: &str| (key == ENV_MAX_DEPTH).then(|| "deep".to_string());
        assert!(Config::discover_with_env(temp.path(), &cli, bad_depth).is_err());

        let bad_bool = |key: &str| (key == ENV_HIDE_SENSITIVE_FIELDS).then(|| "maybe".to_string());
        assert!(Config::discover_with_env(temp.path(), &cli, bad_bool).is_err());

        let off = |key: &str| (key == ENV_HIDE_SENSITIVE_FIELDS).then(|| "off".to_string());
        let config = Config::discover_with_env(temp.path(), &cli, off).unwrap();
        assert_eq!(config.redaction.hide_sensitive_fields, Some(false));
    }
}
