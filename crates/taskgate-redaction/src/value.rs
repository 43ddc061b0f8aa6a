//! Structured values walked by the redaction engine.
//!
//! [`Value`] is a closed set of shapes. Types outside that set plug in through
//! [`ObjectView`], and shared or cyclic graphs are built from [`SharedValue`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, Serializer};

/// Field-name keyed container. Keys double as the name hint during redaction.
pub type Mapping = BTreeMap<String, Value>;

/// A structured value as seen by the masker.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(String),
    Mapping(Mapping),
    Sequence(Vec<Value>),
    Tuple(Vec<Value>),
    /// Members in insertion order. Redaction turns sets into tuples because
    /// distinct secrets may collapse to the same token.
    Set(Vec<Value>),
    Enum(EnumValue),
    Object(Arc<dyn ObjectView>),
    Shared(SharedValue),
}

/// A member of a domain enumeration together with its underlying literal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub type_name: String,
    pub variant: String,
    pub value: Box<Value>,
}

impl EnumValue {
    pub fn new(
        type_name: impl Into<String>,
        variant: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
            value: Box::new(value.into()),
        }
    }
}

/// How a foreign object exposes itself to the masker.
#[derive(Debug, Clone)]
pub enum ObjectShape {
    /// Nothing to look at (file handles, sockets, clients). Returned as-is.
    Opaque,
    /// A dict-like view, redacted as a mapping at the same depth.
    Dict(Mapping),
    /// A name/value pair such as an environment variable definition. The value is
    /// hidden outright when the name is sensitive.
    NamedValue { name: String, value: Value },
}

/// Adapter point for types the core [`Value`] set does not cover.
pub trait ObjectView: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    fn shape(&self) -> ObjectShape {
        ObjectShape::Opaque
    }
}

/// Reference-counted, lock-guarded node. Identity is the allocation address.
///
/// Cycles built from `SharedValue` keep themselves alive; callers that build
/// them for long-lived data should break the back edge when done.
#[derive(Clone)]
pub struct SharedValue(Arc<RwLock<Value>>);

impl SharedValue {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Stable identity of the node for the lifetime of the allocation.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedValue({:#x})", self.id())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Mapping(a), Self::Mapping(b)) => a == b,
            (Self::Sequence(a), Self::Sequence(b))
            | (Self::Tuple(a), Self::Tuple(b))
            | (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Self::Shared(a), Self::Shared(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Build a mapping from key/value pairs.
    pub fn mapping<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn sequence<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a set, dropping members equal to an earlier one.
    pub fn set<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut members: Vec<Value> = Vec::new();
        for item in items {
            let item = item.into();
            if !members.contains(&item) {
                members.push(item);
            }
        }
        Self::Set(members)
    }

    pub fn object(view: impl ObjectView + 'static) -> Self {
        Self::Object(Arc::new(view))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key when this value is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Short label for the value's shape, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Mapping(_) => "mapping",
            Self::Sequence(_) => "sequence",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
            Self::Shared(_) => "shared",
        }
    }

    /// Convert to JSON. Tuples and sets become arrays, enums their literal,
    /// objects their view, and a shared node met again on the current path
    /// becomes `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut path = HashSet::new();
        self.to_json_on_path(&mut path)
    }

    fn to_json_on_path(&self, path: &mut HashSet<usize>) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::UInt(u) => Json::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Str(s) => Json::String(s.clone()),
            Self::Mapping(m) => mapping_to_json(m, path),
            Self::Sequence(items) | Self::Tuple(items) | Self::Set(items) => Json::Array(
                items
                    .iter()
                    .map(|item| item.to_json_on_path(path))
                    .collect(),
            ),
            Self::Enum(e) => e.value.to_json_on_path(path),
            Self::Object(obj) => match obj.shape() {
                ObjectShape::Opaque => Json::String(format!("<{}>", obj.type_name())),
                ObjectShape::Dict(m) => mapping_to_json(&m, path),
                ObjectShape::NamedValue { name, value } => {
                    let mut out = serde_json::Map::new();
                    out.insert("name".to_string(), Json::String(name));
                    out.insert("value".to_string(), value.to_json_on_path(path));
                    Json::Object(out)
                }
            },
            Self::Shared(shared) => {
                let id = shared.id();
                if !path.insert(id) {
                    return Json::Null;
                }
                let json = shared.read().to_json_on_path(path);
                path.remove(&id);
                json
            }
        }
    }
}

fn mapping_to_json(map: &Mapping, path: &mut HashSet<usize>) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), v.to_json_on_path(path)))
            .collect(),
    )
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::Str(s),
            Json::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        i64::try_from(u).map_or(Self::UInt(u), Self::Int)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<EnumValue> for Value {
    fn from(e: EnumValue) -> Self {
        Self::Enum(e)
    }
}

impl From<SharedValue> for Value {
    fn from(shared: SharedValue) -> Self {
        Self::Shared(shared)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Handle;

    impl ObjectView for Handle {
        fn type_name(&self) -> &str {
            "FileHandle"
        }
    }

    #[test]
    fn test_json_conversion_keeps_shape() {
        let json = json!({"a": [1, 2.5, "x"], "b": null, "c": {"d": true}});
        let value = Value::from(json.clone());

        assert_eq!(value.get("b"), Some(&Value::Null));
        assert_eq!(value.get("a").map(Value::kind), Some("sequence"));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_tuple_set_and_enum_serialize_as_literals() {
        let value = Value::mapping([
            ("t", Value::tuple(["a", "b"])),
            ("s", Value::set(["a", "a", "c"])),
            ("e", Value::Enum(EnumValue::new("Color", "Red", "red"))),
        ]);

        assert_eq!(
            value.to_json(),
            json!({"t": ["a", "b"], "s": ["a", "c"], "e": "red"})
        );
    }

    #[test]
    fn test_large_integers_survive_json_round_trip() {
        let json = json!({"max": u64::MAX, "edge": 9_223_372_036_854_775_808_u64, "neg": i64::MIN});
        let value = Value::from(json.clone());

        assert_eq!(value.get("max"), Some(&Value::UInt(u64::MAX)));
        assert_eq!(value.get("neg"), Some(&Value::Int(i64::MIN)));
        assert_eq!(value.to_json(), json);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"edge":9223372036854775808,"max":18446744073709551615,"neg":-9223372036854775808}"#
        );
    }

    #[test]
    fn test_opaque_object_serializes_as_type_name() {
        let value = Value::object(Handle);
        assert_eq!(value.to_json(), json!("<FileHandle>"));
    }

    #[test]
    fn test_cyclic_shared_node_terminates() {
        let node = SharedValue::new(Value::mapping([("name", "root")]));
        if let Value::Mapping(m) = &mut *node.write() {
            m.insert("self_ref".to_string(), Value::Shared(node.clone()));
        }

        let json = Value::Shared(node.clone()).to_json();
        assert_eq!(json, json!({"name": "root", "self_ref": null}));

        // Break the cycle so the allocation is released.
        *node.write() = Value::Null;
    }

    #[test]
    fn test_shared_equality_is_identity() {
        let a = SharedValue::new(Value::from("x"));
        let b = SharedValue::new(Value::from("x"));

        assert_eq!(Value::Shared(a.clone()), Value::Shared(a.clone()));
        assert_ne!(Value::Shared(a), Value::Shared(b));
    }

    #[test]
    fn test_tuple_and_sequence_are_distinct() {
        assert_ne!(Value::tuple(["a"]), Value::sequence(["a"]));
        assert_ne!(Value::set(["a"]), Value::tuple(["a"]));
    }
}
