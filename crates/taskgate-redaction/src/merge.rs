//! Reconcile an edited copy of redacted data with the unredacted original.
//!
//! Callers show users `redact(old)`, the user edits it into `new`, and
//! [`Reconciler::merge`] puts the real secrets back wherever `new` still
//! holds exactly what redaction would have produced.

use std::collections::{HashMap, HashSet};

use crate::masker::{MatchContext, Redactor};
use crate::value::{SharedValue, Value};

pub(crate) struct Reconciler<'a> {
    ctx: &'a MatchContext,
    /// Merged copy of each shared node of `new`, made on first encounter.
    merged_new: HashMap<usize, SharedValue>,
    /// Shared nodes of `old` on the current path.
    old_path: HashSet<usize>,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(ctx: &'a MatchContext) -> Self {
        Self {
            ctx,
            merged_new: HashMap::new(),
            old_path: HashSet::new(),
        }
    }

    /// `hidden` is set once the walk has crossed a sensitive name.
    pub(crate) fn merge(
        &mut self,
        new: &Value,
        old: &Value,
        name: Option<&str>,
        hidden: bool,
        depth: usize,
    ) -> Value {
        if depth > self.ctx.max_depth {
            // Redaction collapses a hidden subtree past the limit to the token
            // and leaves anything else untouched.
            return if hidden && *new == Redactor::new(self.ctx).redact_all(old, depth) {
                old.clone()
            } else {
                new.clone()
            };
        }
        let hidden = hidden || self.ctx.should_hide(name);

        match (new, old) {
            (Value::Shared(shared), _) => {
                if let Some(copy) = self.merged_new.get(&shared.id()) {
                    return Value::Shared(copy.clone());
                }
                let copy = SharedValue::new(Value::Null);
                self.merged_new.insert(shared.id(), copy.clone());

                let inner = shared.read();
                let merged = self.merge(&inner, old, name, hidden, depth);
                drop(inner);
                *copy.write() = merged;
                Value::Shared(copy)
            }
            (_, Value::Shared(shared)) => {
                let id = shared.id();
                if !self.old_path.insert(id) {
                    return new.clone();
                }
                let inner = shared.read();
                let merged = self.merge(new, &inner, name, hidden, depth);
                drop(inner);
                self.old_path.remove(&id);
                merged
            }
            (Value::Mapping(new_map), Value::Mapping(old_map)) => Value::Mapping(
                new_map
                    .iter()
                    .map(|(key, new_value)| {
                        let merged = match old_map.get(key) {
                            Some(old_value) => {
                                self.merge(new_value, old_value, Some(key), hidden, depth + 1)
                            }
                            None => new_value.clone(),
                        };
                        (key.clone(), merged)
                    })
                    .collect(),
            ),
            (Value::Sequence(new_items), Value::Sequence(old_items)) => {
                Value::Sequence(self.merge_items(new_items, old_items, name, hidden, depth))
            }
            (Value::Tuple(new_items), Value::Tuple(old_items)) => {
                Value::Tuple(self.merge_items(new_items, old_items, name, hidden, depth))
            }
            // Redaction turns sets into tuples; merging back restores the set.
            (Value::Tuple(new_items) | Value::Set(new_items), Value::Set(old_items)) => {
                Value::Set(self.merge_items(new_items, old_items, name, hidden, depth))
            }
            _ => self.merge_leaf(new, old, name, hidden, depth),
        }
    }

    /// Pairwise by position; extra items in `new` are kept, extra items in
    /// `old` are dropped.
    fn merge_items(
        &mut self,
        new: &[Value],
        old: &[Value],
        name: Option<&str>,
        hidden: bool,
        depth: usize,
    ) -> Vec<Value> {
        new.iter()
            .enumerate()
            .map(|(idx, new_item)| match old.get(idx) {
                Some(old_item) => self.merge(new_item, old_item, name, hidden, depth + 1),
                None => new_item.clone(),
            })
            .collect()
    }

    fn merge_leaf(
        &mut self,
        new: &Value,
        old: &Value,
        name: Option<&str>,
        hidden: bool,
        depth: usize,
    ) -> Value {
        let mut redactor = Redactor::new(self.ctx);
        let expected = if hidden {
            redactor.redact_all(old, depth)
        } else {
            redactor.redact(old, name, depth)
        };
        if *new == expected {
            old.clone()
        } else {
            new.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::masker::SecretsMasker;
    use crate::value::{EnumValue, SharedValue, Value};

    #[test]
    fn test_unchanged_redacted_value_restores_original() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", "hunter22"), ("host", "db.local")]);
        let shown = m.redact(&old, None, None);

        assert_eq!(m.merge(&shown, &old, None, None), old);
    }

    #[test]
    fn test_user_edit_is_kept() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", "hunter22"), ("host", "db.local")]);
        let new = Value::mapping([("password", "newpass1"), ("host", "db.local")]);

        assert_eq!(m.merge(&new, &old, None, None), new);
    }

    #[test]
    fn test_non_sensitive_name_keeps_new() {
        let m = SecretsMasker::default();
        let merged = m.merge(&Value::from("***"), &Value::from("plain"), Some("host"), None);
        assert_eq!(merged, Value::from("***"));
    }

    #[test]
    fn test_sensitive_name_restores_old() {
        let m = SecretsMasker::default();
        let merged = m.merge(
            &Value::from("***"),
            &Value::from("hunter22"),
            Some("password"),
            None,
        );
        assert_eq!(merged, Value::from("hunter22"));
    }

    #[test]
    fn test_keys_follow_new() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", "hunter22"), ("removed", "gone")]);
        let new = Value::mapping([("password", "***"), ("added", "fresh")]);

        assert_eq!(
            m.merge(&new, &old, None, None),
            Value::mapping([("password", "hunter22"), ("added", "fresh")])
        );
    }

    #[test]
    fn test_sequence_length_follows_new() {
        let m = SecretsMasker::default();
        let old = Value::sequence(["hunter22", "other22"]);
        let new = Value::sequence(["***", "***", "extra"]);

        assert_eq!(
            m.merge(&new, &old, Some("password"), None),
            Value::sequence(["hunter22", "other22", "extra"])
        );
    }

    #[test]
    fn test_set_round_trip() {
        let m = SecretsMasker::default();
        let old = Value::set(["alpha1", "bravo2"]);
        let shown = m.redact(&old, Some("token"), None);
        assert_eq!(shown, Value::tuple(["***", "***"]));

        assert_eq!(m.merge(&shown, &old, Some("token"), None), old);
    }

    #[test]
    fn test_enum_round_trip() {
        let m = SecretsMasker::default();
        let old = Value::Enum(EnumValue::new("Level", "high", "topsecret"));
        let shown = m.redact(&old, Some("secret"), None);

        assert_eq!(m.merge(&shown, &old, Some("secret"), None), old);
    }

    fn nested_list(depth: usize, leaf: &str) -> Value {
        let mut value = Value::from(leaf);
        for _ in 0..depth {
            value = Value::Sequence(vec![value]);
        }
        value
    }

    #[test]
    fn test_hidden_subtree_past_depth_round_trips() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", nested_list(6, "hunter22"))]);
        let shown = m.redact(&old, None, None);
        assert_eq!(
            shown,
            Value::mapping([("password", nested_list(5, "***"))])
        );

        assert_eq!(m.merge(&shown, &old, None, None), old);
    }

    #[test]
    fn test_hidden_subtree_past_depth_keeps_edit() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", nested_list(6, "hunter22"))]);
        let edited = Value::mapping([("password", nested_list(5, "changed1"))]);

        assert_eq!(m.merge(&edited, &old, None, None), edited);
    }

    #[test]
    fn test_shared_nodes_merge_back_once() {
        let m = SecretsMasker::default();
        let node = SharedValue::new(Value::mapping([("password", "hunter22")]));
        let old = Value::mapping([
            ("primary", Value::Shared(node.clone())),
            ("replica", Value::Shared(node.clone())),
        ]);
        let shown = m.redact(&old, None, None);

        let merged = m.merge(&shown, &old, None, None);
        assert_eq!(merged.to_json(), old.to_json());
        match (merged.get("primary"), merged.get("replica")) {
            (Some(Value::Shared(a)), Some(Value::Shared(b))) => assert!(a.ptr_eq(b)),
            other => panic!("expected shared nodes, got {other:?}"),
        }
    }

    #[test]
    fn test_shared_old_under_plain_new_is_restored_twice() {
        let m = SecretsMasker::default();
        let node = SharedValue::new(Value::from("hunter22"));
        let old = Value::mapping([
            ("password", Value::Shared(node.clone())),
            ("token", Value::Shared(node)),
        ]);
        let new = Value::mapping([("password", "***"), ("token", "***")]);

        assert_eq!(
            m.merge(&new, &old, None, None),
            Value::mapping([("password", "hunter22"), ("token", "hunter22")])
        );
    }

    #[test]
    fn test_past_depth_new_wins() {
        let m = SecretsMasker::default();
        let old = Value::mapping([("password", "hunter22")]);
        let new = Value::mapping([("password", "***")]);

        assert_eq!(m.merge(&new, &old, None, Some(0)), new);
    }
}
