//! Depends-on-past evaluation.
//!
//! A task instance may only proceed once the same task's instances in the
//! schedule-adjacent previous run have succeeded (or been skipped), and,
//! with `wait_for_downstream`, once their direct downstream instances have
//! too.

use serde::{Deserialize, Serialize};
use taskgate_utils::error::LookupError;
use taskgate_utils::logging::dep_span;
use tracing::debug;

use crate::lookup::{MarkerSink, PAST_DEPENDS_MET, PriorRunLookup};
use crate::types::{DagRun, DepContext, TaskInstance, TaskPolicy, is_done};

/// Display name of the dependency.
pub const PREV_RUN_DEP_NAME: &str = "Previous Dagrun State";

/// One reason recorded while evaluating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepStatus {
    pub passed: bool,
    pub reason: String,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepEvaluation {
    pub dep_name: String,
    pub passed: bool,
    pub statuses: Vec<DepStatus>,
    /// Whether `past_depends_met` was pushed for the task instance.
    pub marker_pushed: bool,
}

impl DepEvaluation {
    /// Reasons of failing statuses.
    #[must_use]
    pub fn failure_reasons(&self) -> Vec<&str> {
        self.statuses
            .iter()
            .filter(|s| !s.passed)
            .map(|s| s.reason.as_str())
            .collect()
    }
}

/// The previous-run dependency.
pub struct PrevRunDep<'a> {
    lookup: &'a dyn PriorRunLookup,
    markers: &'a dyn MarkerSink,
}

impl<'a> PrevRunDep<'a> {
    pub fn new(lookup: &'a dyn PriorRunLookup, markers: &'a dyn MarkerSink) -> Self {
        Self { lookup, markers }
    }

    /// Boolean projection of [`evaluate`](Self::evaluate).
    ///
    /// # Errors
    ///
    /// Propagates any [`LookupError`] from the run lookup.
    pub fn is_met(
        &self,
        ti: &TaskInstance,
        task: &TaskPolicy,
        ctx: &DepContext,
    ) -> Result<bool, LookupError> {
        Ok(self.evaluate(ti, task, ctx)?.passed)
    }

    /// Evaluate the dependency for `ti`, pushing the marker when it passes
    /// and the context asks for it.
    ///
    /// A failing verdict never pushes the marker.
    ///
    /// # Errors
    ///
    /// Propagates any [`LookupError`] from the run lookup.
    pub fn evaluate(
        &self,
        ti: &TaskInstance,
        task: &TaskPolicy,
        ctx: &DepContext,
    ) -> Result<DepEvaluation, LookupError> {
        let _span = dep_span(&ti.dag_id, &ti.task_id, &ti.run_id).entered();

        if !task.requires_past() {
            debug!("depends_on_past not set; passing");
            return Ok(Self::verdict(
                true,
                "The task did not have depends_on_past set.",
                false,
            ));
        }

        if ctx.ignore_depends_on_past {
            return Ok(self.pass(
                ti,
                ctx,
                "The context specified that the state of past runs could be ignored.",
            ));
        }

        let Some(run) = self.lookup.get_run(&ti.dag_id, &ti.run_id)? else {
            return Ok(Self::verdict(
                true,
                "This task instance does not belong to a run.",
                false,
            ));
        };

        let Some(prev_run) = self.lookup.get_previous_run(&run, true)? else {
            return Ok(self.pass(
                ti,
                ctx,
                "This task instance was the first task instance for its task.",
            ));
        };
        debug!(prev_run_id = %prev_run.run_id, "Resolved previous run");

        if Self::task_newer_than(task, &prev_run) {
            return Ok(self.pass(
                ti,
                ctx,
                "This task instance was the first task instance for its task.",
            ));
        }

        let prev_tis = self.lookup.get_task_instances(&prev_run, &ti.task_id)?;
        if prev_tis.is_empty() {
            let reason = if task.ignore_first_occurrence
                && !self.lookup.has_any_prior_task_instances(ti)?
            {
                "This task instance was the first task instance for its task."
            } else {
                "The previous run has no instances of this task; the task was added after it."
            };
            return Ok(self.pass(ti, ctx, reason));
        }

        let unsuccessful = prev_tis.iter().filter(|p| !is_done(p.state)).count();
        if unsuccessful > 0 {
            debug!(unsuccessful, "Previous task instances not done");
            return Ok(Self::verdict(
                false,
                format!(
                    "depends_on_past is true for this task, but {unsuccessful} previous task instance(s) are not in a successful state."
                ),
                false,
            ));
        }

        if task.wait_for_downstream && self.has_unsuccessful_dependants(&prev_run, &ti.task_id)? {
            return Ok(Self::verdict(
                false,
                "The tasks downstream of the previous task instance(s) did not complete, and wait_for_downstream is true.",
                false,
            ));
        }

        Ok(self.pass(
            ti,
            ctx,
            "The previous task instance(s) completed successfully.",
        ))
    }

    fn task_newer_than(task: &TaskPolicy, prev_run: &DagRun) -> bool {
        match (task.start_date, prev_run.logical_date) {
            (Some(start), Some(prev)) => start > prev,
            _ => false,
        }
    }

    fn has_unsuccessful_dependants(
        &self,
        prev_run: &DagRun,
        task_id: &str,
    ) -> Result<bool, LookupError> {
        let downstream = self
            .lookup
            .get_downstream_task_ids(&prev_run.dag_id, task_id)?;
        for downstream_id in &downstream {
            let tis = self.lookup.get_task_instances(prev_run, downstream_id)?;
            if tis.iter().any(|d| !is_done(d.state)) {
                debug!(downstream_task_id = %downstream_id, "Downstream task not done");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn pass(&self, ti: &TaskInstance, ctx: &DepContext, reason: &str) -> DepEvaluation {
        let push = ctx.wait_for_past_depends_before_skipping;
        if push {
            self.markers.push_marker(ti, PAST_DEPENDS_MET, true);
            debug!(key = PAST_DEPENDS_MET, "Pushed marker");
        }
        Self::verdict(true, reason, push)
    }

    fn verdict(passed: bool, reason: impl Into<String>, marker_pushed: bool) -> DepEvaluation {
        DepEvaluation {
            dep_name: PREV_RUN_DEP_NAME.to_string(),
            passed,
            statuses: vec![DepStatus {
                passed,
                reason: reason.into(),
            }],
            marker_pushed,
        }
    }
}
