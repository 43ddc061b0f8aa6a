//! CLI command implementations.
//!
//! Each handler returns the exit code to use on success, so a gate that is
//! not met is not an error.

mod check;
mod common;
mod config;
mod redact;

pub use check::execute_check_command;
pub use config::execute_config_command;
pub use redact::{execute_merge_command, execute_redact_command};
