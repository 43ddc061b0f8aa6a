//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Installs tracing and the global masker
//! - Dispatches to command handlers
//! - Handles all error output

use clap::Parser;
use taskgate_redaction::{configure_secrets_masker, redact_user_string};
use tracing::warn;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, ConfigError, ExitCode, TaskgateError, init_tracing};

/// Main CLI execution function.
///
/// Handles ALL output including errors and returns the exit code to use
/// when it is not success. `main` only maps the code to the process exit.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        verbose: cli.verbose.then_some(true),
        log_format: cli.log_format.clone(),
        sensitive_fields: cli.sensitive_fields.clone(),
        extra_patterns: cli.extra_patterns.clone(),
        min_secret_length: cli.min_secret_length,
        max_depth: cli.max_depth,
        adapter: cli.adapter.clone(),
        builtin_rules: cli.builtin_rules.then_some(true),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = init_tracing(
        config.verbose(),
        config.log_format(),
        config.logging.level.as_deref(),
    ) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    if let Err(e) = configure_secrets_masker(config.masker_settings()) {
        let err = TaskgateError::Config(ConfigError::InvalidValue {
            key: "extra_patterns".to_string(),
            value: e.to_string(),
        });
        eprint!("{}", err.display_for_user());
        return Err(err.to_exit_code());
    }

    let result = match cli.command {
        Commands::Check(args) => commands::execute_check_command(&args),
        Commands::Redact { file, name, masks } => {
            commands::execute_redact_command(file.as_deref(), name.as_deref(), &masks)
        }
        Commands::Merge {
            new,
            old,
            name,
            masks,
        } => commands::execute_merge_command(&new, &old, name.as_deref(), &masks),
        Commands::Config { json } => commands::execute_config_command(&config, json),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => Err(report_error(&err)),
    }
}

/// Print an error for the user and pick its exit code.
fn report_error(err: &anyhow::Error) -> ExitCode {
    if let Some(typed) = err.downcast_ref::<TaskgateError>() {
        eprint!("{}", typed.display_for_user());
        return typed.to_exit_code();
    }
    warn!("unexpected failure");
    eprintln!("Error: {}", redact_user_string(&format!("{err:#}")));
    ExitCode::INTERNAL
}
