//! taskgate - past-run dependency gating and structured secret redaction
//!
//! taskgate answers two questions for a workflow scheduler:
//!
//! - May this task instance run, given how the same task did in the previous run?
//!   See [`PrevRunDep`].
//! - What does this value look like with every secret masked, and how do edits
//!   made to a masked copy map back onto the real value? See [`SecretsMasker`].
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! taskgate check --state runs.json --dag etl --run r2 --task extract --json
//! echo '{"password": "hunter2"}' | taskgate redact
//! taskgate config
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust
//! use taskgate::{
//!     DagRun, DepContext, InMemoryRunStore, PrevRunDep, RecordingMarkerSink, TaskInstance,
//!     TaskInstanceState, TaskPolicy,
//! };
//!
//! let store = InMemoryRunStore::new();
//! store.add_run(DagRun::new("etl", "r2"));
//! let markers = RecordingMarkerSink::new();
//! let dep = PrevRunDep::new(&store, &markers);
//!
//! let ti = TaskInstance::new("etl", "extract", "r2").with_state(TaskInstanceState::Scheduled);
//! let policy = TaskPolicy { depends_on_past: true, ..TaskPolicy::default() };
//! // No logical date means no predecessor, so the gate passes.
//! assert!(dep.is_met(&ti, &policy, &DepContext::default()).unwrap());
//! ```
//!
//! # JSON Contracts
//!
//! `taskgate check --json` and `taskgate config --json` emit JCS (RFC 8785)
//! canonical JSON. Use [`emit_jcs`] for your own integrations.

pub mod cli;

pub use taskgate_config::{CliArgs, Config, ConfigBuilder, ConfigSource};
pub use taskgate_deps::{
    CheckReport, DagRun, DagRunType, DagSpec, DepContext, DepEvaluation, DepStatus,
    InMemoryRunStore, MarkerSink, PAST_DEPENDS_MET, PREV_RUN_DEP_NAME, PrevRunDep,
    PriorRunLookup, PushedMarker, RecordingMarkerSink, RunStoreState, TaskInstance,
    TaskInstanceState, TaskPolicy, TaskSpec, emit_check_json,
};
pub use taskgate_redaction::{
    MaskerSettings, REDACTION_TOKEN, RedactedWriter, SecretAdapter, SecretsMasker,
    SensitiveFields, SensitivePatternStore, Value,
};
pub use taskgate_utils::{
    ConfigError, ExitCode, LogFormat, LookupError, TaskgateError, UserFriendlyError, emit_jcs,
    init_tracing,
};
