//! Read/write curve JSON files.
//!
//! Curve JSON is the portable representation of a fitted activation curve:
//! - the run's inputs and the 9 coefficients (`t` in seconds)
//! - fit diagnostics
//! - the fitted values on the evaluated grid, for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveFile, CurveGrid, FitQuality, FitReport, ParameterSet, ResultRow};
use crate::error::{AppError, ErrorKind};
use crate::report::rmse;

/// Build the curve file for a finished run.
pub fn curve_file(params: &ParameterSet, report: &FitReport, rows: &[ResultRow]) -> CurveFile {
    CurveFile {
        tool: "ampa".to_string(),
        generated_at: Utc::now(),
        inputs: *params,
        time_unit: "s".to_string(),
        coefficients: report.params,
        fit_quality: FitQuality {
            attempts: report.attempts,
            iterations: report.iterations,
            sse: report.sse,
            rmse: rmse(rows),
            n: rows.len(),
        },
        grid: CurveGrid {
            time_ms: rows.iter().map(|r| r.time_ms).collect(),
            fitted: rows.iter().map(|r| r.fitted_value).collect(),
        },
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create curve JSON '{}': {e}", path.display()),
        )
    })?;

    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to open curve JSON '{}': {e}", path.display()),
        )
    })?;
    let curve: CurveFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Invalid curve JSON: {e}")))?;
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FittedCurveParameters;

    #[test]
    fn written_curve_reads_back() {
        let params = ParameterSet::new(1.0, 2.0, 3.0, 4.0, 5.0);
        let report = FitReport {
            params: FittedCurveParameters::from_ordered([
                0.5,
                -1234.5678901234567,
                0.0,
                0.0,
                1.0,
                506002.35193288676,
                0.0,
                0.0,
                2.0,
            ]),
            attempts: 1,
            iterations: 4,
            sse: 1e-9,
        };
        let rows: Vec<ResultRow> = (0..3)
            .map(|i| ResultRow {
                params,
                time_ms: i as f64 * 10.0,
                point_estimate: 0.5,
                fitted_value: 0.5,
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.json");
        write_curve_json(&path, &curve_file(&params, &report, &rows)).unwrap();
        let back = read_curve_json(&path).unwrap();

        assert_eq!(back.tool, "ampa");
        assert_eq!(back.inputs, params);
        assert_eq!(back.coefficients, report.params);
        assert_eq!(back.fit_quality.n, 3);
        assert_eq!(back.grid.time_ms, vec![0.0, 10.0, 20.0]);
        assert_eq!(back.grid.fitted, vec![0.5; 3]);
    }

    #[test]
    fn malformed_curve_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(read_curve_json(&path).unwrap_err().kind(), ErrorKind::Io);
    }
}
