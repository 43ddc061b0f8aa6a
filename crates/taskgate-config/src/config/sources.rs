use std::collections::BTreeMap;

use super::Config;

impl Config {
    /// Effective configuration as `key -> (value, source label)`.
    ///
    /// Ordered by key so the output is stable.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                let source = self.source_of(key).label().to_string();
                config.insert(key.to_string(), (value, source));
            }
        };

        let redaction = &self.redaction;
        let settings = self.masker_settings();

        add("sensitive_fields", Some(settings.sensitive_fields.fields().join(",")));
        add(
            "hide_sensitive_fields",
            Some(settings.sensitive_fields.hides().to_string()),
        );
        add("min_secret_length", Some(settings.min_secret_length.to_string()));
        add("max_depth", Some(settings.max_depth.to_string()));
        add("adapter", redaction.adapter.clone());
        add("skip_words", Some(settings.skip_words.join(",")));
        if !redaction.extra_patterns.is_empty() {
            add("extra_patterns", Some(redaction.extra_patterns.join(",")));
        }
        add("builtin_rules", Some(settings.builtin_rules.to_string()));
        add("log_level", self.logging.level.clone());
        add("log_format", Some(self.log_format().to_string()));
        add("verbose", Some(self.verbose().to_string()));

        config
    }
}
