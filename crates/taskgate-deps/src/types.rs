//! Run and task-instance records consumed by the evaluator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInstanceState {
    Scheduled,
    Queued,
    Running,
    Success,
    Failed,
    Skipped,
    UpForRetry,
    UpForReschedule,
    UpstreamFailed,
    Restarting,
    Removed,
    Deferred,
}

impl TaskInstanceState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::UpForRetry => "up_for_retry",
            Self::UpForReschedule => "up_for_reschedule",
            Self::UpstreamFailed => "upstream_failed",
            Self::Restarting => "restarting",
            Self::Removed => "removed",
            Self::Deferred => "deferred",
        }
    }

    /// Success or skipped.
    #[must_use]
    pub const fn is_successful(self) -> bool {
        matches!(self, Self::Success | Self::Skipped)
    }
}

/// An instance with no state has not run, so it never counts as done.
#[must_use]
pub fn is_done(state: Option<TaskInstanceState>) -> bool {
    state.is_some_and(TaskInstanceState::is_successful)
}

/// Why a run was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DagRunType {
    #[default]
    Scheduled,
    Manual,
    Backfill,
    AssetTriggered,
}

/// One execution of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagRun {
    pub dag_id: String,
    pub run_id: String,
    /// The nominal time the run represents. Manual runs may have none.
    #[serde(default)]
    pub logical_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub run_type: DagRunType,
    #[serde(default)]
    pub backfill_id: Option<i64>,
}

impl DagRun {
    pub fn new(dag_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            dag_id: dag_id.into(),
            run_id: run_id.into(),
            logical_date: None,
            run_type: DagRunType::Scheduled,
            backfill_id: None,
        }
    }

    #[must_use]
    pub fn with_logical_date(mut self, logical_date: DateTime<Utc>) -> Self {
        self.logical_date = Some(logical_date);
        self
    }

    #[must_use]
    pub fn with_run_type(mut self, run_type: DagRunType) -> Self {
        self.run_type = run_type;
        self
    }

    #[must_use]
    pub fn with_backfill(mut self, backfill_id: i64) -> Self {
        self.backfill_id = Some(backfill_id);
        self.run_type = DagRunType::Backfill;
        self
    }
}

fn unmapped() -> i64 {
    -1
}

/// Execution record of one task within one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    pub dag_id: String,
    pub task_id: String,
    pub run_id: String,
    /// `-1` for unmapped tasks.
    #[serde(default = "unmapped")]
    pub map_index: i64,
    #[serde(default)]
    pub state: Option<TaskInstanceState>,
}

impl TaskInstance {
    pub fn new(
        dag_id: impl Into<String>,
        task_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            dag_id: dag_id.into(),
            task_id: task_id.into(),
            run_id: run_id.into(),
            map_index: unmapped(),
            state: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: TaskInstanceState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_map_index(mut self, map_index: i64) -> Self {
        self.map_index = map_index;
        self
    }

    /// Same dag, run, task and map index.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.dag_id == other.dag_id
            && self.run_id == other.run_id
            && self.task_id == other.task_id
            && self.map_index == other.map_index
    }
}

/// Temporal-dependency flags from the task definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPolicy {
    #[serde(default)]
    pub depends_on_past: bool,
    /// Exempt the first instance of a task added to an existing workflow.
    #[serde(default)]
    pub ignore_first_occurrence: bool,
    /// Also require the predecessor's direct downstream instances to be done.
    #[serde(default)]
    pub wait_for_downstream: bool,
    /// When the task was introduced. Predecessor runs before this date
    /// cannot hold an instance of it.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

impl TaskPolicy {
    /// Waiting on downstream implies depending on the past.
    #[must_use]
    pub fn requires_past(&self) -> bool {
        self.depends_on_past || self.wait_for_downstream
    }
}

/// Evaluation-time overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepContext {
    /// Force the check to pass.
    #[serde(default)]
    pub ignore_depends_on_past: bool,
    /// Push the `past_depends_met` marker whenever the check passes.
    #[serde(default)]
    pub wait_for_past_depends_before_skipping: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization_is_snake_case() {
        let json = serde_json::to_string(&TaskInstanceState::UpstreamFailed).unwrap();
        assert_eq!(json, "\"upstream_failed\"");
        let parsed: TaskInstanceState = serde_json::from_str("\"up_for_retry\"").unwrap();
        assert_eq!(parsed, TaskInstanceState::UpForRetry);
        assert_eq!(parsed.as_str(), "up_for_retry");
    }

    #[test]
    fn test_done_states() {
        assert!(is_done(Some(TaskInstanceState::Success)));
        assert!(is_done(Some(TaskInstanceState::Skipped)));
        assert!(!is_done(Some(TaskInstanceState::Running)));
        assert!(!is_done(Some(TaskInstanceState::Failed)));
        assert!(!is_done(None));
    }

    #[test]
    fn test_task_instance_defaults() {
        let ti: TaskInstance =
            serde_json::from_str(r#"{"dag_id":"d","task_id":"t","run_id":"r"}"#).unwrap();
        assert_eq!(ti.map_index, -1);
        assert_eq!(ti.state, None);
    }

    #[test]
    fn test_wait_for_downstream_implies_past() {
        let policy = TaskPolicy {
            wait_for_downstream: true,
            ..TaskPolicy::default()
        };
        assert!(policy.requires_past());
        assert!(!TaskPolicy::default().requires_past());
    }

    #[test]
    fn test_backfill_builder_sets_run_type() {
        let run = DagRun::new("d", "backfill__1").with_backfill(3);
        assert_eq!(run.backfill_id, Some(3));
        assert_eq!(run.run_type, DagRunType::Backfill);
    }
}
