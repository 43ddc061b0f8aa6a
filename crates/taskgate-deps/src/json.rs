//! JSON emission for dependency evaluations.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use taskgate_utils::canonicalization::emit_jcs;

use crate::memory::PushedMarker;
use crate::prev_run::DepEvaluation;
use crate::types::TaskInstance;

/// Everything `taskgate check --json` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub task_instance: TaskInstance,
    pub evaluation: DepEvaluation,
    pub markers: Vec<PushedMarker>,
}

/// Emit a check report as canonical JSON using JCS (RFC 8785).
pub fn emit_check_json(report: &CheckReport) -> anyhow::Result<String> {
    emit_jcs(report).context("Failed to emit check JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prev_run::{DepStatus, PREV_RUN_DEP_NAME};

    #[test]
    fn test_emit_check_json() {
        let report = CheckReport {
            task_instance: TaskInstance::new("etl", "extract", "r2"),
            evaluation: DepEvaluation {
                dep_name: PREV_RUN_DEP_NAME.to_string(),
                passed: true,
                statuses: vec![DepStatus {
                    passed: true,
                    reason: "ok".to_string(),
                }],
                marker_pushed: true,
            },
            markers: vec![PushedMarker {
                dag_id: "etl".to_string(),
                task_id: "extract".to_string(),
                run_id: "r2".to_string(),
                map_index: -1,
                key: "past_depends_met".to_string(),
                value: true,
            }],
        };

        let json = emit_check_json(&report).unwrap();
        assert!(json.starts_with(r#"{"evaluation":{"dep_name":"Previous Dagrun State""#));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["evaluation"]["passed"], true);
        assert_eq!(parsed["markers"][0]["key"], "past_depends_met");
        assert_eq!(parsed["task_instance"]["state"], serde_json::Value::Null);
    }
}
