//! Derived forms of a secret that are masked alongside the original.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use url::Url;
use url::form_urlencoded::byte_serialize;

/// Names accepted by [`adapter_by_name`].
pub const ADAPTER_NAMES: &[&str] = &["url-encode", "url-parse"];

/// Produces secondary encodings of a secret.
///
/// Every string returned is registered as its own pattern, subject to the
/// same minimum-length gate as the original.
pub trait SecretAdapter: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn adapt(&self, secret: &str) -> Vec<String>;
}

/// Form-urlencoded form of the secret (`a<b` becomes `a%3Cb`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncodeAdapter;

impl SecretAdapter for UrlEncodeAdapter {
    fn name(&self) -> &str {
        "url-encode"
    }

    fn adapt(&self, secret: &str) -> Vec<String> {
        let encoded: String = byte_serialize(secret.as_bytes()).collect();
        if encoded == secret {
            Vec::new()
        } else {
            vec![encoded]
        }
    }
}

/// Components of a URL secret: scheme, netloc, path, query and fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParseAdapter;

impl SecretAdapter for UrlParseAdapter {
    fn name(&self) -> &str {
        "url-parse"
    }

    fn adapt(&self, secret: &str) -> Vec<String> {
        let Ok(url) = Url::parse(secret) else {
            return Vec::new();
        };

        let mut netloc = String::new();
        if !url.username().is_empty() || url.password().is_some() {
            netloc.push_str(url.username());
            if let Some(password) = url.password() {
                netloc.push(':');
                netloc.push_str(password);
            }
            netloc.push('@');
        }
        if let Some(host) = url.host_str() {
            netloc.push_str(host);
        }
        if let Some(port) = url.port() {
            let _ = write!(netloc, ":{port}");
        }

        [
            url.scheme().to_string(),
            netloc,
            url.path().to_string(),
            url.query().unwrap_or_default().to_string(),
            url.fragment().unwrap_or_default().to_string(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect()
    }
}

/// Resolve a configured adapter name.
#[must_use]
pub fn adapter_by_name(name: &str) -> Option<Arc<dyn SecretAdapter>> {
    match name {
        "url-encode" => Some(Arc::new(UrlEncodeAdapter)),
        "url-parse" => Some(Arc::new(UrlParseAdapter)),
        _ => None,
    }
}
