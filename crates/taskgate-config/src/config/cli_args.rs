use std::path::PathBuf;

/// CLI arguments that feed configuration discovery.
///
/// Every field is optional; `None` (or empty) leaves the lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub log_format: Option<String>,
    /// Appended to the sensitive field list from lower layers.
    pub sensitive_fields: Vec<String>,
    pub extra_patterns: Vec<String>,
    pub min_secret_length: Option<usize>,
    pub max_depth: Option<usize>,
    pub adapter: Option<String>,
    pub builtin_rules: Option<bool>,
}
