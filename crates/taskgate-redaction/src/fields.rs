//! Field-name heuristic for name-based redaction.

/// Substrings that mark a field name as sensitive.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "access_token",
    "api_key",
    "apikey",
    "authorization",
    "passphrase",
    "passwd",
    "password",
    "private_key",
    "secret",
    "token",
    "keyfile_dict",
    "service_account",
];

/// Lowercased sensitive-name substrings plus the global hide switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitiveFields {
    fields: Vec<String>,
    hide: bool,
}

impl Default for SensitiveFields {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl SensitiveFields {
    /// Defaults extended with `extra`.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields = Self {
            fields: Vec::new(),
            hide: true,
        };
        fields.extend(DEFAULT_SENSITIVE_FIELDS.iter().copied());
        fields.extend(extra);
        fields
    }

    /// Add more substrings. Blank entries are ignored.
    pub fn extend<I, S>(&mut self, extra: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in extra {
            let field = field.as_ref().trim().to_lowercase();
            if !field.is_empty() && !self.fields.contains(&field) {
                self.fields.push(field);
            }
        }
        self.fields.sort();
    }

    #[must_use]
    pub fn with_hide(mut self, hide: bool) -> Self {
        self.hide = hide;
        self
    }

    pub fn set_hide(&mut self, hide: bool) {
        self.hide = hide;
    }

    #[must_use]
    pub fn hides(&self) -> bool {
        self.hide
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether a value stored under `name` should be hidden entirely.
    #[must_use]
    pub fn should_hide(&self, name: &str) -> bool {
        if !self.hide {
            return false;
        }
        let name = name.trim().to_lowercase();
        self.fields.iter().any(|field| name.contains(field.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fields_match_by_substring() {
        let fields = SensitiveFields::default();

        assert!(fields.should_hide("password"));
        assert!(fields.should_hide("GOOGLE_APIKEY"));
        assert!(fields.should_hide("  db_Password "));
        assert!(fields.should_hide("gcp_service_account_json"));
        assert!(!fields.should_hide("key"));
        assert!(!fields.should_hide("hostname"));
        assert!(!fields.should_hide(""));
    }

    #[test]
    fn test_extension_is_normalized() {
        let fields = SensitiveFields::new(["  Cookie ", "", "password"]);

        assert!(fields.should_hide("session_cookie"));
        assert_eq!(
            fields.fields().iter().filter(|f| f.as_str() == "password").count(),
            1
        );
        assert!(!fields.fields().iter().any(String::is_empty));
    }

    #[test]
    fn test_hide_switch_disables_name_matching() {
        let fields = SensitiveFields::default().with_hide(false);
        assert!(!fields.should_hide("password"));
        assert!(!fields.hides());
    }
}
