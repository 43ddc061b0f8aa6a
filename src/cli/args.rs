//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// taskgate - past-run dependency gating and secret redaction
#[derive(Parser)]
#[command(name = "taskgate")]
#[command(about = "Evaluate depends-on-past gates and redact secrets in structured values")]
#[command(long_about = r#"
taskgate decides whether a task instance may run given the outcome of the same
task in the previous run, and masks secrets in structured values before they are
logged or displayed.

EXAMPLES:
  # Check whether extract may run in run r2
  taskgate check --state runs.json --dag etl --run r2 --task extract

  # Same, as canonical JSON including pushed markers
  taskgate check --state runs.json --dag etl --run r2 --task extract --json

  # Redact a JSON document read from stdin
  echo '{"password": "hunter2", "user": "ann"}' | taskgate redact

  # Register a literal secret first
  taskgate redact payload.json --mask 's3cr3t-value'

  # Restore masked values from the previous version of a document
  taskgate merge edited.json stored.json --mask-file secrets.json

  # Show effective configuration with sources
  taskgate config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > environment > config file > defaults
  Config file is discovered by searching upward from CWD for .taskgate/config.toml
  Use --config to specify an explicit config file path

EXIT CODES:
  0 success, 1 internal error, 2 configuration error, 3 dependency not met,
  4 run lookup failed, 65 invalid input
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format
    #[arg(long, global = true, value_parser = ["compact", "json"])]
    pub log_format: Option<String>,

    /// Extra field name whose values are always hidden (repeatable)
    #[arg(long = "sensitive-field", value_name = "NAME", global = true)]
    pub sensitive_fields: Vec<String>,

    /// Extra regex applied to every redacted string (repeatable)
    #[arg(long = "extra-pattern", value_name = "REGEX", global = true)]
    pub extra_patterns: Vec<String>,

    /// Secrets shorter than this are not registered
    #[arg(long, value_name = "N", global = true)]
    pub min_secret_length: Option<usize>,

    /// Nesting depth past which values are left alone
    #[arg(long, value_name = "N", global = true)]
    pub max_depth: Option<usize>,

    /// Also register encoded forms of each secret
    #[arg(long, value_name = "NAME", global = true, value_parser = ["url-encode", "url-parse"])]
    pub adapter: Option<String>,

    /// Enable the built-in credential rules
    #[arg(long, global = true)]
    pub builtin_rules: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate the depends-on-past gate for one task instance
    ///
    /// Exits 0 when the dependency is met and 3 when it is not.
    ///
    /// EXAMPLES:
    ///   taskgate check --state runs.json --dag etl --run r2 --task extract
    ///   taskgate check --state runs.json --dag etl --run r2 --task load --map-index 3 --json
    Check(CheckArgs),

    /// Redact secrets in a JSON document
    ///
    /// Reads FILE (or stdin when FILE is omitted or '-') and prints the
    /// redacted document.
    Redact {
        /// Input JSON file, '-' for stdin
        file: Option<PathBuf>,

        /// Field name the whole document is stored under
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        masks: MaskArgs,
    },

    /// Restore masked values in an edited document from its previous version
    Merge {
        /// Edited JSON document
        new: PathBuf,

        /// Previous JSON document holding the real values
        old: PathBuf,

        /// Field name both documents are stored under
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        masks: MaskArgs,
    },

    /// Show effective configuration with value sources
    Config {
        /// Output as canonical JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// JSON state file describing workflows, runs and task instances
    #[arg(long)]
    pub state: PathBuf,

    /// Workflow id
    #[arg(long = "dag")]
    pub dag_id: String,

    /// Run id
    #[arg(long = "run")]
    pub run_id: String,

    /// Task id
    #[arg(long = "task")]
    pub task_id: String,

    /// Map index of a mapped task instance
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub map_index: i64,

    /// Pass regardless of the previous run
    #[arg(long)]
    pub ignore_depends_on_past: bool,

    /// Push the past_depends_met marker when the gate passes
    #[arg(long)]
    pub wait_for_past_depends_before_skipping: bool,

    /// Output as canonical JSON
    #[arg(long)]
    pub json: bool,
}

/// Secrets registered before redacting or merging.
#[derive(Args, Debug, Clone, Default)]
pub struct MaskArgs {
    /// Literal secret to mask (repeatable)
    #[arg(long = "mask", value_name = "SECRET")]
    pub masks: Vec<String>,

    /// JSON document of secrets; mapping keys act as field names
    #[arg(long, value_name = "FILE")]
    pub mask_file: Option<PathBuf>,
}

/// Build the clap command (used by tests and completions).
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
