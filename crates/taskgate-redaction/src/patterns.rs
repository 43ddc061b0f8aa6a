//! Registered secret literals and rules, compiled into a single matcher.
//!
//! The store is shared mutable state. Every mutation rebuilds the compiled
//! matcher under the write lock, and readers take a cheap `Arc` snapshot of
//! the matcher so a traversal never holds the lock.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder, RegexSet};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Upper bound for the compiled alternation. Large deployments register
/// thousands of literals, which overflows the regex crate's default limit.
const MATCHER_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Definition of a built-in credential rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretPatternDef {
    /// Unique identifier for the rule (e.g., "github_pat")
    pub id: &'static str,
    /// Category for grouping in documentation
    pub category: &'static str,
    /// The regex pattern string
    pub regex: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

/// Opt-in rules for well-known credential formats.
pub static BUILTIN_SECRET_PATTERNS: &[SecretPatternDef] = &[
    SecretPatternDef {
        id: "aws_access_key",
        category: "Cloud Credentials",
        regex: r"AKIA[0-9A-Z]{16}",
        description: "AWS access key IDs",
    },
    SecretPatternDef {
        id: "gcp_api_key",
        category: "Cloud Credentials",
        regex: r"AIza[0-9A-Za-z_-]{35}",
        description: "Google API keys",
    },
    SecretPatternDef {
        id: "bearer_token",
        category: "Generic API Tokens",
        regex: r"Bearer [A-Za-z0-9._-]{20,}",
        description: "Bearer authentication tokens",
    },
    SecretPatternDef {
        id: "authorization_basic",
        category: "Generic API Tokens",
        regex: r"Basic [A-Za-z0-9+/=]{20,}",
        description: "Basic auth credentials",
    },
    SecretPatternDef {
        id: "jwt_token",
        category: "Generic API Tokens",
        regex: r"eyJ[A-Za-z0-9_-]*\.eyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]*",
        description: "JSON Web Tokens",
    },
    SecretPatternDef {
        id: "pem_private_key",
        category: "Private Keys",
        regex: r"-----BEGIN (?:RSA |EC |OPENSSH )?PRIVATE KEY-----",
        description: "PEM private key markers",
    },
    SecretPatternDef {
        id: "github_pat",
        category: "Platform Tokens",
        regex: r"ghp_[A-Za-z0-9]{36}",
        description: "GitHub personal access tokens",
    },
    SecretPatternDef {
        id: "slack_token",
        category: "Platform Tokens",
        regex: r"xox[baprs]-[A-Za-z0-9-]+",
        description: "Slack bot/user tokens",
    },
    SecretPatternDef {
        id: "postgres_url",
        category: "Connection URLs",
        regex: r"postgres(?:ql)?://[^:\s]+:[^@\s]+@",
        description: "PostgreSQL URLs with embedded credentials",
    },
];

#[must_use]
pub fn builtin_pattern_defs() -> &'static [SecretPatternDef] {
    BUILTIN_SECRET_PATTERNS
}

#[derive(Debug, Clone)]
struct CompiledRule {
    id: String,
    regex: Regex,
}

#[derive(Debug)]
struct PatternState {
    literals: BTreeSet<String>,
    rules: Vec<CompiledRule>,
    matcher: Option<Arc<Regex>>,
    rule_set: RegexSet,
}

impl PatternState {
    fn empty() -> Self {
        Self {
            literals: BTreeSet::new(),
            rules: Vec::new(),
            matcher: None,
            rule_set: RegexSet::empty(),
        }
    }
}

/// Thread-safe set of secret literals and rules with a compiled matcher.
#[derive(Debug)]
pub struct SensitivePatternStore {
    state: RwLock<PatternState>,
}

impl Default for SensitivePatternStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitivePatternStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PatternState::empty()),
        }
    }

    /// Create a store preloaded with `(id, regex)` rules.
    pub fn with_rules<I, K, P>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let store = Self::new();
        store.set_rules(rules)?;
        Ok(store)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, PatternState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, PatternState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace every rule. Registered literals are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule does not compile; the store is unchanged.
    pub fn set_rules<I, K, P>(&self, rules: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: AsRef<str>,
    {
        let compiled = rules
            .into_iter()
            .map(|(id, pattern)| compile_rule(id.into(), pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.write_state();
        let (matcher, rule_set) = compile_matcher(&state.literals, &compiled)?;
        state.rules = compiled;
        state.matcher = matcher;
        state.rule_set = rule_set;
        Ok(())
    }

    /// Add a single regex rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule does not compile; the store is unchanged.
    pub fn add_rule(&self, id: impl Into<String>, pattern: &str) -> Result<()> {
        let rule = compile_rule(id.into(), pattern)?;

        let mut state = self.write_state();
        let mut rules = state.rules.clone();
        rules.retain(|existing| existing.id != rule.id);
        rules.push(rule);
        let (matcher, rule_set) = compile_matcher(&state.literals, &rules)?;
        state.rules = rules;
        state.matcher = matcher;
        state.rule_set = rule_set;
        Ok(())
    }

    /// Register one literal. Returns whether it was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuilt matcher exceeds the size limit.
    pub fn add_literal(&self, literal: &str) -> Result<bool> {
        Ok(self.add_literals([literal])? > 0)
    }

    /// Register literals in one rebuild. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuilt matcher exceeds the size limit; no
    /// literal from the batch is kept in that case.
    pub fn add_literals<I, S>(&self, literals: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.write_state();

        let fresh: BTreeSet<String> = literals
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| !s.is_empty() && !state.literals.contains(s))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut next = state.literals.clone();
        next.extend(fresh.iter().cloned());
        let (matcher, rule_set) = compile_matcher(&next, &state.rules)?;
        state.literals = next;
        state.matcher = matcher;
        state.rule_set = rule_set;
        Ok(fresh.len())
    }

    #[must_use]
    pub fn contains(&self, literal: &str) -> bool {
        self.read_state().literals.contains(literal)
    }

    /// Registered literals, unescaped, in sorted order.
    #[must_use]
    pub fn patterns(&self) -> Vec<String> {
        self.read_state().literals.iter().cloned().collect()
    }

    #[must_use]
    pub fn rule_ids(&self) -> Vec<String> {
        self.read_state()
            .rules
            .iter()
            .map(|rule| rule.id.clone())
            .collect()
    }

    /// Number of registered literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_state().literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_state().literals.is_empty()
    }

    /// Snapshot of the compiled matcher, `None` when nothing is registered.
    #[must_use]
    pub fn matcher(&self) -> Option<Arc<Regex>> {
        self.read_state().matcher.clone()
    }

    /// Replace every match in `text` with `token`.
    #[must_use]
    pub fn replace_all(&self, text: &str, token: &str) -> String {
        match self.matcher() {
            Some(matcher) => matcher.replace_all(text, token).into_owned(),
            None => text.to_string(),
        }
    }

    /// Ids of the rules that match somewhere in `text`.
    #[must_use]
    pub fn matching_rule_ids(&self, text: &str) -> Vec<String> {
        let state = self.read_state();
        state
            .rule_set
            .matches(text)
            .iter()
            .filter_map(|index| state.rules.get(index).map(|rule| rule.id.clone()))
            .collect()
    }

    /// Forget every registered literal. Rules stay in place.
    pub fn reset(&self) {
        let mut state = self.write_state();
        state.literals.clear();
        // Rules alone already compiled once, so this cannot fail in practice.
        match compile_matcher(&state.literals, &state.rules) {
            Ok((matcher, rule_set)) => {
                state.matcher = matcher;
                state.rule_set = rule_set;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to rebuild secret matcher after reset");
                state.matcher = None;
                state.rule_set = RegexSet::empty();
            }
        }
    }

    /// Forget literals and rules.
    pub fn clear(&self) {
        *self.write_state() = PatternState::empty();
    }
}

fn compile_rule(id: String, pattern: &str) -> Result<CompiledRule> {
    let regex = Regex::new(pattern)
        .with_context(|| format!("Failed to compile secret rule '{id}': {pattern}"))?;
    Ok(CompiledRule { id, regex })
}

/// Rules first, then literals longest-first so the longest secret wins at a
/// given position.
fn compile_matcher(
    literals: &BTreeSet<String>,
    rules: &[CompiledRule],
) -> Result<(Option<Arc<Regex>>, RegexSet)> {
    let rule_set = RegexSet::new(rules.iter().map(|rule| rule.regex.as_str()))
        .context("Failed to compile RegexSet for secret rules")?;

    let mut ordered: Vec<&String> = literals.iter().collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternatives: Vec<String> = rules
        .iter()
        .map(|rule| format!("(?:{})", rule.regex.as_str()))
        .chain(ordered.into_iter().map(|literal| regex::escape(literal)))
        .collect();

    if alternatives.is_empty() {
        return Ok((None, rule_set));
    }

    let matcher = RegexBuilder::new(&alternatives.join("|"))
        .size_limit(MATCHER_SIZE_LIMIT)
        .build()
        .context("Failed to compile secret matcher")?;

    Ok((Some(Arc::new(matcher)), rule_set))
}
