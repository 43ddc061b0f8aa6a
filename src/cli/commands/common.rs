//! Shared helpers for command implementations.

use std::io::Read;
use std::path::Path;

use anyhow::Result;
use taskgate_redaction::{Value, mask_secret};
use tracing::debug;

use crate::TaskgateError;
use crate::cli::args::MaskArgs;

/// Read a JSON document from `path`, or stdin when `path` is `None` or `-`.
pub(super) fn read_json(path: Option<&Path>) -> Result<serde_json::Value> {
    let (label, content) = match path {
        Some(path) if path != Path::new("-") => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                TaskgateError::Input(format!("cannot read {}: {e}", path.display()))
            })?;
            (path.display().to_string(), content)
        }
        _ => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| TaskgateError::Input(format!("cannot read stdin: {e}")))?;
            ("stdin".to_string(), content)
        }
    };

    let json = serde_json::from_str(&content)
        .map_err(|e| TaskgateError::Input(format!("{label} is not valid JSON: {e}")))?;
    Ok(json)
}

/// Register `--mask` literals and the `--mask-file` document with the global masker.
pub(super) fn register_masks(masks: &MaskArgs) -> Result<usize> {
    let mut added = 0;
    for secret in &masks.masks {
        added += mask_secret(&Value::from(secret.as_str()), None);
    }
    if let Some(path) = &masks.mask_file {
        let secrets = read_json(Some(path))?;
        added += mask_secret(&Value::from(secrets), None);
    }
    debug!(added, "Registered masks");
    Ok(added)
}

/// Pretty JSON for terminal output.
pub(super) fn to_pretty_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&value.to_json())?)
}
