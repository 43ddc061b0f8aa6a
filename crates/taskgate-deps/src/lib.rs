//! Depends-on-past evaluation for taskgate.
//!
//! [`PrevRunDep`] decides whether a task instance may run given the state of
//! the same task in the previous run. Run history comes from a
//! [`PriorRunLookup`]; the `past_depends_met` marker goes to a [`MarkerSink`].

pub mod json;
pub mod lookup;
pub mod memory;
pub mod prev_run;
pub mod types;

pub use json::{CheckReport, emit_check_json};
pub use lookup::{MarkerSink, PAST_DEPENDS_MET, PriorRunLookup};
pub use memory::{DagSpec, InMemoryRunStore, PushedMarker, RecordingMarkerSink, RunStoreState, TaskSpec};
pub use prev_run::{DepEvaluation, DepStatus, PREV_RUN_DEP_NAME, PrevRunDep};
pub use types::{
    DagRun, DagRunType, DepContext, TaskInstance, TaskInstanceState, TaskPolicy, is_done,
};
