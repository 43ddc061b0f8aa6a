//! Redact and merge command implementations
//!
//! Handles `taskgate redact` and `taskgate merge`.

use std::path::Path;

use anyhow::Result;
use taskgate_redaction::Value;
use taskgate_redaction::global::{merge, redact};

use super::common::{read_json, register_masks, to_pretty_json};
use crate::ExitCode;
use crate::cli::args::MaskArgs;

/// Execute the redact command
pub fn execute_redact_command(
    file: Option<&Path>,
    name: Option<&str>,
    masks: &MaskArgs,
) -> Result<ExitCode> {
    register_masks(masks)?;
    let item = Value::from(read_json(file)?);
    let redacted = redact(&item, name, None);
    println!("{}", to_pretty_json(&redacted)?);
    Ok(ExitCode::SUCCESS)
}

/// Execute the merge command
pub fn execute_merge_command(
    new: &Path,
    old: &Path,
    name: Option<&str>,
    masks: &MaskArgs,
) -> Result<ExitCode> {
    register_masks(masks)?;
    let new_value = Value::from(read_json(Some(new))?);
    let old_value = Value::from(read_json(Some(old))?);
    let merged = merge(&new_value, &old_value, name, None);
    println!("{}", to_pretty_json(&merged)?);
    Ok(ExitCode::SUCCESS)
}
