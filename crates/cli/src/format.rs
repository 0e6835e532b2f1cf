//! Output formatting for run reports and errors.

use bank_harness::{HarnessError, RunReport};

/// Output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a passing run.
pub fn format_report(report: &RunReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => format!("[{}] {}", report.run_id, report),
    }
}

/// Format a failed run.
pub fn format_error(err: &HarnessError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => {
            let kind = if err.violation().is_some() {
                "violation"
            } else {
                "error"
            };
            serde_json::to_string_pretty(&serde_json::json!({
                "passed": false,
                "kind": kind,
                "error": err.to_string(),
            }))
            .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err))
        }
        OutputMode::Human => format!("FAIL: {}", err),
    }
}
