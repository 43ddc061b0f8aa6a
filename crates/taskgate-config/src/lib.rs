//! Configuration for taskgate.
//!
//! Values resolve with precedence CLI > environment > config file > defaults.
//! Every resolved key remembers where it came from so `taskgate config` can
//! report it.

pub mod config;

pub use config::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CliArgs, Config, ConfigBuilder, ConfigSource,
    ENV_HIDE_SENSITIVE_FIELDS, ENV_LOG_FORMAT, ENV_MAX_DEPTH, ENV_SENSITIVE_FIELDS, LoggingConfig,
    RedactionConfig,
};
