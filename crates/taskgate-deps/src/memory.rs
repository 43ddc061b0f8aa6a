//! In-memory run store and marker sink.
//!
//! Backs the CLI (loaded from a JSON state file) and the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use taskgate_utils::error::{LookupError, TaskgateError};
use tracing::debug;

use crate::lookup::{MarkerSink, PriorRunLookup};
use crate::types::{DagRun, DagRunType, TaskInstance, TaskPolicy};

/// A task definition: its policy plus direct downstream task ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(flatten)]
    pub policy: TaskPolicy,
    #[serde(default)]
    pub downstream: BTreeSet<String>,
}

/// Tasks of one workflow keyed by task id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DagSpec {
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskSpec>,
}

/// Serializable snapshot of a [`InMemoryRunStore`].
///
/// ```json
/// {
///   "dags": {"etl": {"tasks": {"extract": {"depends_on_past": true, "downstream": ["load"]}}}},
///   "runs": [{"dag_id": "etl", "run_id": "r1", "logical_date": "2024-01-01T00:00:00Z"}],
///   "task_instances": [{"dag_id": "etl", "task_id": "extract", "run_id": "r1", "state": "success"}],
///   "backfills": []
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunStoreState {
    #[serde(default)]
    pub dags: BTreeMap<String, DagSpec>,
    #[serde(default)]
    pub runs: Vec<DagRun>,
    #[serde(default)]
    pub task_instances: Vec<TaskInstance>,
    #[serde(default)]
    pub backfills: BTreeSet<i64>,
}

/// Which earlier runs may be a predecessor.
#[derive(Debug, Clone, Copy)]
enum PredecessorScope {
    Regular,
    Backfill(i64),
    Any,
}

impl PredecessorScope {
    fn admits(self, run: &DagRun) -> bool {
        match self {
            Self::Regular => run.backfill_id.is_none() && run.run_type != DagRunType::Manual,
            Self::Backfill(id) => run.backfill_id == Some(id),
            Self::Any => true,
        }
    }
}

/// [`PriorRunLookup`] over lock-guarded in-memory state.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    state: RwLock<RunStoreState>,
}

impl InMemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_state(state: RunStoreState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Load a store from a JSON state file.
    ///
    /// # Errors
    ///
    /// Returns [`TaskgateError::Io`] if the file cannot be read and
    /// [`TaskgateError::StateFile`] if it is not a valid state document.
    pub fn load(path: &Path) -> Result<Self, TaskgateError> {
        let content = std::fs::read_to_string(path)?;
        let state: RunStoreState =
            serde_json::from_str(&content).map_err(|e| TaskgateError::StateFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            path = %path.display(),
            runs = state.runs.len(),
            task_instances = state.task_instances.len(),
            "Loaded run store"
        );
        Ok(Self::from_state(state))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RunStoreState>, LookupError> {
        self.state.read().map_err(|_| LookupError::Poisoned)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunStoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_task(&self, dag_id: &str, task_id: &str, spec: TaskSpec) {
        self.write()
            .dags
            .entry(dag_id.to_string())
            .or_default()
            .tasks
            .insert(task_id.to_string(), spec);
    }

    /// Insert a run, replacing one with the same dag and run id.
    pub fn add_run(&self, run: DagRun) {
        let mut state = self.write();
        state
            .runs
            .retain(|r| !(r.dag_id == run.dag_id && r.run_id == run.run_id));
        state.runs.push(run);
    }

    /// Insert a task instance, replacing one with the same identity.
    pub fn add_task_instance(&self, ti: TaskInstance) {
        let mut state = self.write();
        state.task_instances.retain(|existing| !existing.same_identity(&ti));
        state.task_instances.push(ti);
    }

    pub fn add_backfill(&self, backfill_id: i64) {
        self.write().backfills.insert(backfill_id);
    }

    pub fn remove_backfill(&self, backfill_id: i64) {
        self.write().backfills.remove(&backfill_id);
    }

    /// Policy of a task, or the default policy for unknown tasks.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Poisoned`] if a writer panicked.
    pub fn task_policy(&self, dag_id: &str, task_id: &str) -> Result<TaskPolicy, LookupError> {
        Ok(self
            .read()?
            .dags
            .get(dag_id)
            .and_then(|dag| dag.tasks.get(task_id))
            .map(|spec| spec.policy.clone())
            .unwrap_or_default())
    }

    /// The stored instance, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Poisoned`] if a writer panicked.
    pub fn task_instance(
        &self,
        dag_id: &str,
        run_id: &str,
        task_id: &str,
        map_index: i64,
    ) -> Result<Option<TaskInstance>, LookupError> {
        Ok(self
            .read()?
            .task_instances
            .iter()
            .find(|ti| {
                ti.dag_id == dag_id
                    && ti.run_id == run_id
                    && ti.task_id == task_id
                    && ti.map_index == map_index
            })
            .cloned())
    }

    /// Copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Poisoned`] if a writer panicked.
    pub fn snapshot(&self) -> Result<RunStoreState, LookupError> {
        Ok(self.read()?.clone())
    }
}

impl PriorRunLookup for InMemoryRunStore {
    fn get_run(&self, dag_id: &str, run_id: &str) -> Result<Option<DagRun>, LookupError> {
        Ok(self
            .read()?
            .runs
            .iter()
            .find(|r| r.dag_id == dag_id && r.run_id == run_id)
            .cloned())
    }

    fn get_previous_run(
        &self,
        current: &DagRun,
        match_backfill: bool,
    ) -> Result<Option<DagRun>, LookupError> {
        let state = self.read()?;
        let Some(logical_date) = current.logical_date else {
            return Ok(None);
        };

        let scope = match (match_backfill, current.backfill_id) {
            (false, _) => PredecessorScope::Any,
            (true, None) => PredecessorScope::Regular,
            (true, Some(backfill_id)) => {
                if !state.backfills.contains(&backfill_id) {
                    return Err(LookupError::BackfillNotFound {
                        backfill_id,
                        run_id: current.run_id.clone(),
                    });
                }
                PredecessorScope::Backfill(backfill_id)
            }
        };

        Ok(state
            .runs
            .iter()
            .filter(|r| r.dag_id == current.dag_id && r.run_id != current.run_id)
            .filter(|r| scope.admits(r))
            .filter_map(|r| {
                r.logical_date
                    .filter(|date| *date < logical_date)
                    .map(|date| (date, r))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, r)| r.clone()))
    }

    fn get_task_instances(
        &self,
        run: &DagRun,
        task_id: &str,
    ) -> Result<Vec<TaskInstance>, LookupError> {
        let state = self.read()?;
        if !state
            .runs
            .iter()
            .any(|r| r.dag_id == run.dag_id && r.run_id == run.run_id)
        {
            return Err(LookupError::RunNotFound {
                dag_id: run.dag_id.clone(),
                run_id: run.run_id.clone(),
            });
        }

        let mut tis: Vec<TaskInstance> = state
            .task_instances
            .iter()
            .filter(|ti| ti.dag_id == run.dag_id && ti.run_id == run.run_id && ti.task_id == task_id)
            .cloned()
            .collect();
        tis.sort_by_key(|ti| ti.map_index);
        Ok(tis)
    }

    fn get_downstream_task_ids(
        &self,
        dag_id: &str,
        task_id: &str,
    ) -> Result<BTreeSet<String>, LookupError> {
        Ok(self
            .read()?
            .dags
            .get(dag_id)
            .and_then(|dag| dag.tasks.get(task_id))
            .map(|spec| spec.downstream.clone())
            .unwrap_or_default())
    }

    fn has_any_prior_task_instances(&self, ti: &TaskInstance) -> Result<bool, LookupError> {
        let state = self.read()?;
        let logical_date_of = |run_id: &str| {
            state
                .runs
                .iter()
                .find(|r| r.dag_id == ti.dag_id && r.run_id == run_id)
                .and_then(|r| r.logical_date)
        };
        let current = logical_date_of(&ti.run_id);

        Ok(state.task_instances.iter().any(|other| {
            other.dag_id == ti.dag_id
                && other.task_id == ti.task_id
                && other.run_id != ti.run_id
                && match (current, logical_date_of(&other.run_id)) {
                    (Some(current), Some(other_date)) => other_date < current,
                    (None, _) => true,
                    (Some(_), None) => false,
                }
        }))
    }
}

/// A marker recorded by [`RecordingMarkerSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedMarker {
    pub dag_id: String,
    pub task_id: String,
    pub run_id: String,
    pub map_index: i64,
    pub key: String,
    pub value: bool,
}

/// Marker sink that keeps every push in memory.
#[derive(Debug, Default)]
pub struct RecordingMarkerSink {
    markers: Mutex<Vec<PushedMarker>>,
}

impl RecordingMarkerSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markers(&self) -> Vec<PushedMarker> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl MarkerSink for RecordingMarkerSink {
    fn push_marker(&self, ti: &TaskInstance, key: &str, value: bool) {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PushedMarker {
                dag_id: ti.dag_id.clone(),
                task_id: ti.task_id.clone(),
                run_id: ti.run_id.clone(),
                map_index: ti.map_index,
                key: key.to_string(),
                value,
            });
    }
}
