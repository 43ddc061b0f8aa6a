use anyhow::{Context, Result};
use serde::Serialize;

/// Emit a value as JCS-canonical JSON (RFC 8785).
///
/// Every JSON document taskgate prints goes through here, so output is
/// byte-stable regardless of struct field order or map iteration order.
///
/// ```rust
/// use taskgate_utils::canonicalization::emit_jcs;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Verdict {
///     passed: bool,
///     dep: &'static str,
/// }
///
/// let json = emit_jcs(&Verdict { passed: true, dep: "prev_run" }).unwrap();
/// assert_eq!(json, r#"{"dep":"prev_run","passed":true}"#);
/// ```
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value =
        serde_json::to_value(value).with_context(|| "Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .with_context(|| "Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).with_context(|| "JCS output contained invalid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_key_order_is_canonical() {
        let mut map = HashMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        map.insert("mid", 3);

        assert_eq!(emit_jcs(&map).unwrap(), r#"{"alpha":2,"mid":3,"zeta":1}"#);
    }

    #[test]
    fn test_nested_values_have_no_whitespace() {
        let value = serde_json::json!({"b": [1, {"d": null, "c": "x"}], "a": true});
        assert_eq!(
            emit_jcs(&value).unwrap(),
            r#"{"a":true,"b":[1,{"c":"x","d":null}]}"#
        );
    }
}
