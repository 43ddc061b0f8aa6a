//! Structured secret masking for taskgate.
//!
//! Secrets are registered with [`SecretsMasker::add_mask`] and removed from
//! arbitrary [`Value`] trees by [`SecretsMasker::redact`]. After a user edits
//! a redacted copy, [`SecretsMasker::merge`] puts the originals back where the
//! redacted form was left untouched.
//!
//! ```
//! use taskgate_redaction::{SecretsMasker, Value};
//!
//! let masker = SecretsMasker::default();
//! let conn = Value::mapping([("login", "admin"), ("password", "hunter22")]);
//!
//! let shown = masker.redact(&conn, None, None);
//! assert_eq!(shown.get("password"), Some(&Value::from("***")));
//! assert_eq!(masker.merge(&shown, &conn, None, None), conn);
//! ```

pub mod adapters;
pub mod fields;
pub mod global;
pub mod masker;
mod merge;
pub mod patterns;
pub mod value;
pub mod writer;

/// Placeholder substituted for every hidden value.
pub const REDACTION_TOKEN: &str = "***";

pub use adapters::{ADAPTER_NAMES, SecretAdapter, UrlEncodeAdapter, UrlParseAdapter, adapter_by_name};
pub use fields::{DEFAULT_SENSITIVE_FIELDS, SensitiveFields};
pub use global::{
    configure_secrets_masker, mask_secret, redact_user_string, reset_secrets_masker,
    secrets_masker, should_hide_value_for_key,
};
pub use masker::{
    DEFAULT_MAX_DEPTH, DEFAULT_MIN_SECRET_LENGTH, DEFAULT_SKIP_WORDS, MaskerSettings,
    SecretsMasker,
};
pub use patterns::{
    BUILTIN_SECRET_PATTERNS, SecretPatternDef, SensitivePatternStore, builtin_pattern_defs,
};
pub use value::{EnumValue, Mapping, ObjectShape, ObjectView, SharedValue, Value};
pub use writer::RedactedWriter;
