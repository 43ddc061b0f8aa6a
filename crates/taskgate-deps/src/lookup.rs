//! Collaborator seams: where runs come from and where markers go.

use std::collections::BTreeSet;

use taskgate_utils::error::LookupError;

use crate::types::{DagRun, TaskInstance};

/// Marker key pushed when the temporal dependency is satisfied.
pub const PAST_DEPENDS_MET: &str = "past_depends_met";

/// Read access to run history.
///
/// Implementations own all I/O. Errors propagate out of the evaluator
/// unchanged; retries and timeouts belong to the caller.
pub trait PriorRunLookup {
    /// The run a task instance belongs to, if it still exists.
    fn get_run(&self, dag_id: &str, run_id: &str) -> Result<Option<DagRun>, LookupError>;

    /// The schedule-adjacent predecessor of `current`.
    ///
    /// With `match_backfill`, a backfill run only sees runs of its own
    /// backfill and a regular run only sees regular scheduled runs.
    fn get_previous_run(
        &self,
        current: &DagRun,
        match_backfill: bool,
    ) -> Result<Option<DagRun>, LookupError>;

    /// Every instance of `task_id` in `run`, across map indexes.
    fn get_task_instances(
        &self,
        run: &DagRun,
        task_id: &str,
    ) -> Result<Vec<TaskInstance>, LookupError>;

    /// Direct downstream task ids of `task_id`.
    fn get_downstream_task_ids(
        &self,
        dag_id: &str,
        task_id: &str,
    ) -> Result<BTreeSet<String>, LookupError>;

    /// Whether the task has any instance in a run earlier than `ti`'s.
    fn has_any_prior_task_instances(&self, ti: &TaskInstance) -> Result<bool, LookupError>;
}

/// Side channel for small durable facts attached to a task instance.
pub trait MarkerSink {
    fn push_marker(&self, ti: &TaskInstance, key: &str, value: bool);
}
