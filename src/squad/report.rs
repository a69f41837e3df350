//! Persisted state layout: the final report and per-agent document dump a
//! workflow writes to its configured output directory on completion.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;
use serde_json::json;

use super::document_context::SharedDocumentContext;
use super::orchestrator::EvolutionResult;
use super::runtime::MetricsSnapshot;

/// Write `<workflow>_report_<YYYYMMDD_HHMMSS>.json` and
/// `documents/<AgentName>.json` under `output_dir`.
///
/// Encoding is UTF-8, JSON with 2-space indentation, timestamps in
/// ISO-8601 (via `chrono`'s `serde` feature on every `DateTime<Utc>`
/// field already flowing through the shared context). The report always
/// carries a metrics block (successes, failures, success rate) and the
/// recent-history slice alongside the evolution outcome.
pub fn persist(
    output_dir: &Path,
    workflow: &str,
    result: &EvolutionResult,
    documents: &SharedDocumentContext,
    metrics: &MetricsSnapshot,
) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let recent_history: Vec<_> = metrics
        .recent_history
        .iter()
        .map(|record| {
            json!({
                "agent_name": record.agent_name,
                "task_type": record.task_type,
                "success": record.success,
                "duration_ms": record.duration_ms,
                "started_at": record.started_at,
            })
        })
        .collect();
    let report = json!({
        "iterations": result.iterations,
        "converged": result.converged,
        "final_gap_score": result.final_gap_score,
        "final_documents": documents.all(),
        "metrics": {
            "total_executions": metrics.total_executions,
            "successful": metrics.successful,
            "failed": metrics.failed,
            "success_rate": metrics.success_rate,
            "average_duration_ms": metrics.average_duration_ms,
            "recent_history": recent_history,
        },
    });
    let report_path = output_dir.join(format!("{workflow}_report_{timestamp}.json"));
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;

    let documents_dir = output_dir.join("documents");
    fs::create_dir_all(&documents_dir)?;
    for (agent_name, entry) in documents.all() {
        let path = documents_dir.join(format!("{agent_name}.json"));
        fs::write(&path, serde_json::to_string_pretty(&entry)?)?;
    }

    Ok(())
}
