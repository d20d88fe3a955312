//! Formatted terminal output for a finished run.

use std::path::Path;

use crate::domain::{COEFFICIENT_NAMES, FitReport, ParameterSet, ResultRow};
use crate::report::rmse;

/// Format the full run summary (inputs + fit diagnostics + coefficients).
pub fn format_run_summary(
    params: &ParameterSet,
    report: &FitReport,
    rows: &[ResultRow],
    output: &Path,
) -> String {
    let mut out = String::new();

    out.push_str("=== ampa - AMPA receptor activation curve ===\n");
    out.push_str(&format!(
        "Inputs: [AMPA]={} | [T]={} | Ls={} | Hc={} | E={}\n",
        params.agonist_conc(),
        params.transmitter_conc(),
        params.ls(),
        params.hc(),
        params.e(),
    ));
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        out.push_str(&format!(
            "Grid: n={} | time=[{}, {}] ms\n",
            rows.len(),
            first.time_ms,
            last.time_ms
        ));
    }

    out.push_str("\nFit diagnostics:\n");
    out.push_str(&format!(
        "attempt={} iterations={} SSE={:.6e} RMSE={:.6e}\n",
        report.attempts,
        report.iterations,
        report.sse,
        rmse(rows)
    ));

    out.push_str("\nCoefficients (t in seconds):\n");
    for (name, value) in COEFFICIENT_NAMES.iter().zip(report.params.to_ordered()) {
        out.push_str(&format!("- {name:<2} = {value:>16.8e}\n"));
    }

    out.push_str(&format!("\nResults: {}\n", output.display()));
    out
}
