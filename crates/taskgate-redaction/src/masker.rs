//! Recursive redaction engine and secret registration.
//!
//! [`SecretsMasker`] owns a [`SensitivePatternStore`] plus the settings that
//! drive traversal. Each public call takes a snapshot of the compiled matcher
//! and the field heuristic, then walks the value without holding any lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::REDACTION_TOKEN;
use crate::adapters::SecretAdapter;
use crate::fields::SensitiveFields;
use crate::merge::Reconciler;
use crate::patterns::{SensitivePatternStore, builtin_pattern_defs};
use crate::value::{Mapping, ObjectShape, SharedValue, Value};

/// Secrets shorter than this are never registered as patterns.
pub const DEFAULT_MIN_SECRET_LENGTH: usize = 5;

/// Container nesting past this depth is left alone.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Values too common to be treated as secrets even when configured as one.
pub const DEFAULT_SKIP_WORDS: &[&str] = &["taskgate"];

static SHORT_SECRET_WARNED: AtomicBool = AtomicBool::new(false);

/// Knobs for a [`SecretsMasker`].
#[derive(Debug, Clone)]
pub struct MaskerSettings {
    pub sensitive_fields: SensitiveFields,
    pub min_secret_length: usize,
    pub max_depth: usize,
    /// Derives extra encodings of each registered secret.
    pub adapter: Option<Arc<dyn SecretAdapter>>,
    pub skip_words: Vec<String>,
    /// Regex rules applied to every string in addition to registered literals.
    pub extra_patterns: Vec<String>,
    /// Enable the built-in credential rules.
    pub builtin_rules: bool,
}

impl Default for MaskerSettings {
    fn default() -> Self {
        Self {
            sensitive_fields: SensitiveFields::default(),
            min_secret_length: DEFAULT_MIN_SECRET_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            adapter: None,
            skip_words: DEFAULT_SKIP_WORDS.iter().map(ToString::to_string).collect(),
            extra_patterns: Vec::new(),
            builtin_rules: false,
        }
    }
}

impl MaskerSettings {
    fn rules(&self) -> Vec<(String, String)> {
        let mut rules = Vec::new();
        if self.builtin_rules {
            rules.extend(
                builtin_pattern_defs()
                    .iter()
                    .map(|def| (def.id.to_string(), def.regex.to_string())),
            );
        }
        rules.extend(
            self.extra_patterns
                .iter()
                .enumerate()
                .map(|(idx, pattern)| (format!("extra_pattern_{idx}"), pattern.clone())),
        );
        rules
    }
}

/// Immutable view used by one traversal.
#[derive(Debug, Clone)]
pub(crate) struct MatchContext {
    pub(crate) fields: SensitiveFields,
    pub(crate) matcher: Option<Arc<Regex>>,
    pub(crate) max_depth: usize,
}

impl MatchContext {
    pub(crate) fn should_hide(&self, name: Option<&str>) -> bool {
        name.is_some_and(|name| !name.is_empty() && self.fields.should_hide(name))
    }

    fn replace(&self, text: &str) -> String {
        match &self.matcher {
            Some(matcher) => matcher.replace_all(text, REDACTION_TOKEN).into_owned(),
            None => text.to_string(),
        }
    }
}

fn token() -> Value {
    Value::Str(REDACTION_TOKEN.to_string())
}

fn named_pair(name: String, value: Value) -> Mapping {
    let mut map = Mapping::new();
    map.insert("name".to_string(), Value::Str(name));
    map.insert("value".to_string(), value);
    map
}

fn named_value(name: String, value: Value) -> Value {
    Value::Mapping(named_pair(name, value))
}

/// One redaction walk. Copies of shared nodes live for a single top-level
/// call, keyed by node identity and whether the whole subtree is hidden.
pub(crate) struct Redactor<'a> {
    ctx: &'a MatchContext,
    copies: HashMap<(usize, bool), SharedValue>,
}

impl<'a> Redactor<'a> {
    pub(crate) fn new(ctx: &'a MatchContext) -> Self {
        Self {
            ctx,
            copies: HashMap::new(),
        }
    }

    pub(crate) fn redact(&mut self, item: &Value, name: Option<&str>, depth: usize) -> Value {
        if depth > self.ctx.max_depth {
            return item.clone();
        }
        if self.ctx.should_hide(name) {
            return self.redact_all(item, depth);
        }

        match item {
            Value::Mapping(map) => Value::Mapping(self.redact_mapping(map, depth)),
            Value::Sequence(items) => Value::Sequence(self.redact_items(items, name, depth)),
            Value::Tuple(items) | Value::Set(items) => {
                Value::Tuple(self.redact_items(items, name, depth))
            }
            Value::Str(s) => Value::Str(self.ctx.replace(s)),
            Value::Enum(e) => self.redact(&e.value, name, depth),
            Value::Object(obj) => match obj.shape() {
                ObjectShape::Opaque => item.clone(),
                ObjectShape::Dict(map) => Value::Mapping(self.redact_mapping(&map, depth)),
                ObjectShape::NamedValue { name, value } => {
                    if self.ctx.should_hide(Some(&name)) {
                        named_value(name, token())
                    } else {
                        Value::Mapping(self.redact_mapping(&named_pair(name, value), depth))
                    }
                }
            },
            Value::Shared(shared) => {
                self.redact_shared(shared, false, |this, inner| this.redact(inner, name, depth))
            }
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::UInt(_)
            | Value::Float(_) => item.clone(),
        }
    }

    /// Name-based redaction: every string leaf becomes the token.
    pub(crate) fn redact_all(&mut self, item: &Value, depth: usize) -> Value {
        if depth > self.ctx.max_depth {
            return token();
        }

        match item {
            Value::Str(_) => token(),
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.redact_all(v, depth + 1)))
                    .collect(),
            ),
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .map(|v| self.redact_all(v, depth + 1))
                    .collect(),
            ),
            Value::Tuple(items) | Value::Set(items) => Value::Tuple(
                items
                    .iter()
                    .map(|v| self.redact_all(v, depth + 1))
                    .collect(),
            ),
            Value::Enum(e) => self.redact_all(&e.value, depth),
            Value::Object(obj) => match obj.shape() {
                ObjectShape::Opaque => item.clone(),
                ObjectShape::Dict(map) => self.redact_all(&Value::Mapping(map), depth),
                ObjectShape::NamedValue { name, value } => {
                    let hidden = self.redact_all(&value, depth + 1);
                    named_value(name, hidden)
                }
            },
            Value::Shared(shared) => {
                self.redact_shared(shared, true, |this, inner| this.redact_all(inner, depth))
            }
            Value::Null
            | Value::Bool(_)
            | Value::Int(_)
            | Value::UInt(_)
            | Value::Float(_) => item.clone(),
        }
    }

    fn redact_mapping(&mut self, map: &Mapping, depth: usize) -> Mapping {
        map.iter()
            .map(|(k, v)| (k.clone(), self.redact(v, Some(k), depth + 1)))
            .collect()
    }

    fn redact_items(&mut self, items: &[Value], name: Option<&str>, depth: usize) -> Vec<Value> {
        items
            .iter()
            .map(|v| self.redact(v, name, depth + 1))
            .collect()
    }

    /// A node met again in this call is not re-descended; it resolves to the
    /// copy made on first encounter, so back edges of a cycle point into the
    /// redacted graph.
    fn redact_shared(
        &mut self,
        shared: &SharedValue,
        hide_all: bool,
        walk: impl FnOnce(&mut Self, &Value) -> Value,
    ) -> Value {
        let key = (shared.id(), hide_all);
        if let Some(copy) = self.copies.get(&key) {
            return Value::Shared(copy.clone());
        }
        let copy = SharedValue::new(Value::Null);
        self.copies.insert(key, copy.clone());

        let inner = shared.read();
        let redacted = walk(self, &inner);
        drop(inner);
        *copy.write() = redacted;
        Value::Shared(copy)
    }
}

/// Walks a value registered through `add_mask` and gathers literal candidates.
struct MaskCollector<'a> {
    settings: &'a MaskerSettings,
    visited: HashSet<usize>,
    found: Vec<String>,
}

impl MaskCollector<'_> {
    fn collect(&mut self, secret: &Value, name: Option<&str>) {
        match secret {
            Value::Mapping(map) => {
                for (key, value) in map {
                    self.collect(value, Some(key));
                }
            }
            Value::Str(s) => self.collect_str(s, name),
            Value::Sequence(items) | Value::Tuple(items) | Value::Set(items) => {
                for item in items {
                    self.collect(item, name);
                }
            }
            Value::Enum(e) => self.collect(&e.value, name),
            Value::Object(obj) => match obj.shape() {
                ObjectShape::Opaque => {}
                ObjectShape::Dict(map) => {
                    for (key, value) in &map {
                        self.collect(value, Some(key));
                    }
                }
                ObjectShape::NamedValue { name, value } => self.collect(&value, Some(&name)),
            },
            Value::Shared(shared) => {
                if self.visited.insert(shared.id()) {
                    let inner = shared.read();
                    self.collect(&inner, name);
                }
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::UInt(_) | Value::Float(_) => {}
        }
    }

    fn collect_str(&mut self, secret: &str, name: Option<&str>) {
        if secret.is_empty() {
            return;
        }
        if self
            .settings
            .skip_words
            .iter()
            .any(|word| word.eq_ignore_ascii_case(secret))
        {
            return;
        }

        let min_length = self.settings.min_secret_length;
        if secret.chars().count() < min_length {
            warn_short_secret(min_length);
            return;
        }
        if let Some(name) = name
            && !name.is_empty()
            && !self.settings.sensitive_fields.should_hide(name)
        {
            return;
        }

        self.found.push(secret.to_string());
        if let Some(adapter) = &self.settings.adapter {
            self.found.extend(
                adapter
                    .adapt(secret)
                    .into_iter()
                    .filter(|derived| derived.chars().count() >= min_length),
            );
        }
    }
}

fn warn_short_secret(min_length: usize) {
    if !SHORT_SECRET_WARNED.swap(true, Ordering::Relaxed) {
        warn!(
            min_length,
            "Skipping masking for a secret as it's too short (<{} chars)", min_length
        );
    }
}

/// Whether the one-time short-secret warning has fired in this process.
#[must_use]
pub fn short_secret_warning_emitted() -> bool {
    SHORT_SECRET_WARNED.load(Ordering::Relaxed)
}

/// Registers secrets and redacts or reconciles structured values.
///
/// All methods take `&self`; pattern mutation is serialized by the store's
/// lock, so one instance can be shared across threads.
#[derive(Debug, Default)]
pub struct SecretsMasker {
    settings: RwLock<MaskerSettings>,
    store: SensitivePatternStore,
}

impl SecretsMasker {
    /// Build a masker, compiling the rules `settings` asks for.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra pattern is not a valid regex.
    pub fn new(settings: MaskerSettings) -> Result<Self> {
        let masker = Self::default();
        masker.configure(settings)?;
        Ok(masker)
    }

    /// Swap settings in place. Registered literals are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if an extra pattern is not a valid regex; the masker
    /// keeps its previous settings in that case.
    pub fn configure(&self, settings: MaskerSettings) -> Result<()> {
        self.store.set_rules(settings.rules())?;
        *self.write_settings() = settings;
        Ok(())
    }

    fn read_settings(&self) -> RwLockReadGuard<'_, MaskerSettings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_settings(&self) -> RwLockWriteGuard<'_, MaskerSettings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn settings(&self) -> MaskerSettings {
        self.read_settings().clone()
    }

    #[must_use]
    pub fn store(&self) -> &SensitivePatternStore {
        &self.store
    }

    /// Forget every registered secret. Configured rules stay active.
    pub fn reset(&self) {
        self.store.reset();
        debug!("Secret patterns reset");
    }

    #[must_use]
    pub fn should_hide_value_for_key(&self, name: &str) -> bool {
        self.read_settings().sensitive_fields.should_hide(name)
    }

    fn match_context(&self, max_depth: Option<usize>) -> MatchContext {
        let settings = self.read_settings();
        MatchContext {
            fields: settings.sensitive_fields.clone(),
            matcher: self.store.matcher(),
            max_depth: max_depth.unwrap_or(settings.max_depth),
        }
    }

    /// Register every string leaf of `secret` as a literal pattern.
    ///
    /// Mapping keys become the name hint for their values. A leaf reached
    /// through a non-sensitive name is not registered. Returns how many new
    /// patterns were added.
    pub fn add_mask(&self, secret: &Value, name: Option<&str>) -> usize {
        let settings = self.read_settings().clone();
        let mut collector = MaskCollector {
            settings: &settings,
            visited: HashSet::new(),
            found: Vec::new(),
        };
        collector.collect(secret, name);

        if collector.found.is_empty() {
            return 0;
        }

        match self.store.add_literals(&collector.found) {
            Ok(added) => {
                if added > 0 {
                    debug!(added, total = self.store.len(), "Registered secret patterns");
                }
                added
            }
            Err(err) => {
                warn!(error = %err, "Failed to rebuild secret matcher; secret not registered");
                0
            }
        }
    }

    /// Register a single string secret.
    pub fn mask_secret(&self, secret: &str, name: Option<&str>) -> usize {
        self.add_mask(&Value::from(secret), name)
    }

    /// Copy of `item` with sensitive leaves replaced by the redaction token.
    ///
    /// `max_depth` overrides the configured depth for this call only.
    #[must_use]
    pub fn redact(&self, item: &Value, name: Option<&str>, max_depth: Option<usize>) -> Value {
        let ctx = self.match_context(max_depth);
        Redactor::new(&ctx).redact(item, name, 0)
    }

    /// Pattern-only redaction of free text.
    #[must_use]
    pub fn redact_str(&self, text: &str) -> String {
        self.store.replace_all(text, REDACTION_TOKEN)
    }

    /// Restore values from `old` wherever `new` still carries their redacted
    /// form, keeping every other edit in `new`.
    #[must_use]
    pub fn merge(
        &self,
        new: &Value,
        old: &Value,
        name: Option<&str>,
        max_depth: Option<usize>,
    ) -> Value {
        let ctx = self.match_context(max_depth);
        Reconciler::new(&ctx).merge(new, old, name, false, 0)
    }
}
