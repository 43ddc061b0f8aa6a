//! Config command implementation
//!
//! Handles `taskgate config` and `taskgate config --json`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::{Config, ExitCode, emit_jcs};

#[derive(Serialize)]
struct ConfigEntry<'a> {
    value: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    config_path: Option<String>,
    values: BTreeMap<&'a str, ConfigEntry<'a>>,
}

/// Execute the config command
pub fn execute_config_command(config: &Config, json: bool) -> Result<ExitCode> {
    let effective = config.effective_config();

    if json {
        let report = ConfigReport {
            config_path: config
                .config_path
                .as_ref()
                .map(|p| p.display().to_string()),
            values: effective
                .iter()
                .map(|(key, (value, source))| {
                    (key.as_str(), ConfigEntry { value, source })
                })
                .collect(),
        };
        println!("{}", emit_jcs(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Effective configuration:");
    match &config.config_path {
        Some(path) => println!("  Config file: {}", path.display()),
        None => println!("  Config file: (none)"),
    }
    for (key, (value, source)) in &effective {
        println!("  {key} = {value}  [{source}]");
    }
    Ok(ExitCode::SUCCESS)
}
