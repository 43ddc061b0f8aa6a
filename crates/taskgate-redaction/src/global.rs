//! Process-wide masker.
//!
//! Logging and error display redact through this instance. It starts with
//! default settings; binaries call [`configure_secrets_masker`] once at
//! startup, and tests that register secrets call [`reset_secrets_masker`]
//! and run under `#[serial]`.

use std::sync::LazyLock;

use anyhow::Result;

use crate::masker::{MaskerSettings, SecretsMasker};
use crate::value::Value;

static SECRETS_MASKER: LazyLock<SecretsMasker> = LazyLock::new(SecretsMasker::default);

/// Get the process-global masker.
#[must_use]
pub fn secrets_masker() -> &'static SecretsMasker {
    &SECRETS_MASKER
}

/// Replace the global masker's settings. Registered secrets are kept.
///
/// # Errors
///
/// Returns an error if an extra pattern fails to compile.
pub fn configure_secrets_masker(settings: MaskerSettings) -> Result<()> {
    secrets_masker().configure(settings)
}

/// Forget every secret registered with the global masker.
pub fn reset_secrets_masker() {
    secrets_masker().reset();
}

/// Register `secret` with the global masker.
pub fn mask_secret(secret: &Value, name: Option<&str>) -> usize {
    secrets_masker().add_mask(secret, name)
}

#[must_use]
pub fn redact(item: &Value, name: Option<&str>, max_depth: Option<usize>) -> Value {
    secrets_masker().redact(item, name, max_depth)
}

/// Redact free text for display, logging or persistence.
#[must_use]
pub fn redact_user_string(text: &str) -> String {
    secrets_masker().redact_str(text)
}

#[must_use]
pub fn merge(new: &Value, old: &Value, name: Option<&str>, max_depth: Option<usize>) -> Value {
    secrets_masker().merge(new, old, name, max_depth)
}

#[must_use]
pub fn should_hide_value_for_key(name: &str) -> bool {
    secrets_masker().should_hide_value_for_key(name)
}
