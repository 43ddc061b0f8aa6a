//! Check command implementation
//!
//! Handles `taskgate check` and `taskgate check --json`.

use anyhow::Result;
use tracing::info;

use crate::cli::args::CheckArgs;
use crate::{
    CheckReport, DepContext, ExitCode, InMemoryRunStore, PAST_DEPENDS_MET, PrevRunDep,
    RecordingMarkerSink, TaskInstance, TaskgateError, emit_check_json,
};

/// Execute the check command
pub fn execute_check_command(args: &CheckArgs) -> Result<ExitCode> {
    let store = InMemoryRunStore::load(&args.state).map_err(|err| match err {
        TaskgateError::Io(e) => TaskgateError::Input(format!(
            "cannot read state file {}: {e}",
            args.state.display()
        )),
        other => other,
    })?;

    let ti = store
        .task_instance(&args.dag_id, &args.run_id, &args.task_id, args.map_index)
        .map_err(TaskgateError::from)?
        .unwrap_or_else(|| {
            TaskInstance::new(&args.dag_id, &args.task_id, &args.run_id)
                .with_map_index(args.map_index)
        });
    let policy = store
        .task_policy(&args.dag_id, &args.task_id)
        .map_err(TaskgateError::from)?;
    let ctx = DepContext {
        ignore_depends_on_past: args.ignore_depends_on_past,
        wait_for_past_depends_before_skipping: args.wait_for_past_depends_before_skipping,
    };

    let markers = RecordingMarkerSink::new();
    let evaluation = PrevRunDep::new(&store, &markers)
        .evaluate(&ti, &policy, &ctx)
        .map_err(TaskgateError::from)?;

    info!(
        dag_id = %ti.dag_id,
        task_id = %ti.task_id,
        run_id = %ti.run_id,
        passed = evaluation.passed,
        "Dependency evaluated"
    );

    let code = if evaluation.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::DEPENDENCY_NOT_MET
    };

    if args.json {
        let report = CheckReport {
            task_instance: ti,
            evaluation,
            markers: markers.markers(),
        };
        println!("{}", emit_check_json(&report)?);
        return Ok(code);
    }

    let verdict = if evaluation.passed { "met" } else { "not met" };
    println!(
        "{}: {verdict} for {}.{} in run {}",
        evaluation.dep_name, ti.dag_id, ti.task_id, ti.run_id
    );
    for status in &evaluation.statuses {
        let mark = if status.passed { "✓" } else { "✗" };
        println!("  {mark} {}", status.reason);
    }
    if evaluation.marker_pushed {
        println!("  marker: {PAST_DEPENDS_MET} = true");
    }

    Ok(code)
}
