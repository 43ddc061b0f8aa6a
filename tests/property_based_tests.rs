//! Property-Based Tests for taskgate
//!
//! Properties:
//! - Redaction is idempotent
//! - Merging a redacted copy back onto its source restores the source
//! - Redaction never leaves a registered secret in a string leaf within the
//!   depth limit
//! - The gate never pushes a marker when it fails
//!
//! ## Configuration
//!
//! Property test case counts can be configured via environment variables:
//!
//! - `PROPTEST_CASES`: Number of test cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: Max shrinking iterations on failure (default: 1000)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use proptest::prelude::*;
use std::env;

use taskgate::{
    DagRun, DepContext, InMemoryRunStore, PrevRunDep, RecordingMarkerSink, SecretsMasker,
    TaskInstance, TaskInstanceState, TaskPolicy, Value,
};
use taskgate_redaction::{DEFAULT_MAX_DEPTH, EnumValue};

/// Default number of test cases per property.
const DEFAULT_PROPTEST_CASES: u32 = 64;

/// Default max shrink iterations.
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

/// Creates a ProptestConfig that respects environment variables.
///
/// `max_cases` caps the case count for slow properties even when
/// `PROPTEST_CASES` asks for more.
fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let env_cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);

    let env_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    let cases = match max_cases {
        Some(max) => env_cases.min(max),
        None => env_cases,
    };

    ProptestConfig {
        cases,
        max_shrink_iters: env_shrink_iters,
        max_shrink_time: 30000,
        ..ProptestConfig::default()
    }
}

const SECRETS: &[&str] = &["hunter2hunter", "s3cretvalue", "tok_abcdef99"];

fn masker_with_secrets() -> SecretsMasker {
    let masker = SecretsMasker::default();
    for secret in SECRETS {
        masker.mask_secret(secret, None);
    }
    masker
}

fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,8}",
        1 => Just("password".to_string()),
        1 => Just("api_key".to_string()),
        1 => Just("Authorization".to_string()),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z0-9 ]{0,12}",
        2 => ("[a-z ]{0,4}", 0..SECRETS.len(), "[a-z ]{0,4}")
            .prop_map(|(prefix, idx, suffix)| format!("{prefix}{}{suffix}", SECRETS[idx])),
    ]
}

fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::from),
        arb_text().prop_map(Value::Str),
        arb_text().prop_map(|s| Value::Enum(EnumValue::new("Color", "Custom", s))),
    ]
}

/// Values nested up to eight containers deep, past the default depth limit.
fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(8, 64, 3, |inner| {
        prop_oneof![
            prop::collection::btree_map(arb_key(), inner.clone(), 0..4).prop_map(Value::Mapping),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Sequence),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Tuple),
            prop::collection::vec(inner, 0..4).prop_map(Value::set),
        ]
    })
}

/// String leaves no deeper than `max_depth`.
fn string_leaves(value: &Value, depth: usize, max_depth: usize, out: &mut Vec<String>) {
    if depth > max_depth {
        return;
    }
    match value {
        Value::Str(s) => out.push(s.clone()),
        Value::Mapping(map) => map
            .values()
            .for_each(|v| string_leaves(v, depth + 1, max_depth, out)),
        Value::Sequence(items) | Value::Tuple(items) | Value::Set(items) => {
            items
                .iter()
                .for_each(|v| string_leaves(v, depth + 1, max_depth, out));
        }
        Value::Enum(e) => string_leaves(&e.value, depth, max_depth, out),
        _ => {}
    }
}

proptest! {
    #![proptest_config(proptest_config(None))]

    #[test]
    fn prop_redaction_is_idempotent(value in arb_value()) {
        let masker = masker_with_secrets();
        let once = masker.redact(&value, None, None);
        let twice = masker.redact(&once, None, None);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_merge_of_redacted_copy_restores_source(value in arb_value()) {
        let masker = masker_with_secrets();
        let redacted = masker.redact(&value, None, None);
        let merged = masker.merge(&redacted, &value, None, None);
        prop_assert_eq!(merged, value);
    }

    #[test]
    fn prop_no_registered_secret_survives(value in arb_value()) {
        let masker = masker_with_secrets();
        let redacted = masker.redact(&value, None, None);
        let mut leaves = Vec::new();
        string_leaves(&redacted, 0, DEFAULT_MAX_DEPTH, &mut leaves);
        for leaf in leaves {
            for secret in SECRETS {
                prop_assert!(!leaf.contains(secret), "{} leaked in {:?}", secret, leaf);
            }
        }
    }
}

proptest! {
    #![proptest_config(proptest_config(Some(32)))]

    #[test]
    fn prop_failed_gate_never_pushes_marker(
        states in prop::collection::vec(
            prop_oneof![
                Just(None),
                Just(Some(TaskInstanceState::Success)),
                Just(Some(TaskInstanceState::Skipped)),
                Just(Some(TaskInstanceState::Failed)),
                Just(Some(TaskInstanceState::Running)),
                Just(Some(TaskInstanceState::UpForRetry)),
            ],
            1..5,
        ),
        wait in any::<bool>(),
    ) {
        use chrono::{TimeZone, Utc};

        let store = InMemoryRunStore::new();
        let day = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap();
        store.add_run(DagRun::new("dag", "prev").with_logical_date(day(1)));
        store.add_run(DagRun::new("dag", "cur").with_logical_date(day(2)));
        for (idx, state) in states.iter().enumerate() {
            let mut ti = TaskInstance::new("dag", "task", "prev").with_map_index(idx as i64);
            ti.state = *state;
            store.add_task_instance(ti);
        }

        let markers = RecordingMarkerSink::new();
        let dep = PrevRunDep::new(&store, &markers);
        let policy = TaskPolicy { depends_on_past: true, ..TaskPolicy::default() };
        let ctx = DepContext {
            wait_for_past_depends_before_skipping: wait,
            ..DepContext::default()
        };
        let evaluation = dep
            .evaluate(&TaskInstance::new("dag", "task", "cur"), &policy, &ctx)
            .unwrap();

        let all_done = states
            .iter()
            .all(|s| matches!(s, Some(TaskInstanceState::Success | TaskInstanceState::Skipped)));
        prop_assert_eq!(evaluation.passed, all_done);
        prop_assert_eq!(markers.markers().len(), usize::from(all_done && wait));
    }
}
