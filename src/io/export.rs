//! Export the result table to CSV.
//!
//! Values are written with full `f64` precision so downstream tools see the
//! exact numbers the pipeline produced.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{RESULT_COLUMNS, ResultRow};
use crate::error::{AppError, ErrorKind};

/// Write the result rows to a CSV file, header first.
pub fn write_results_csv(path: &Path, rows: &[ResultRow]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create results CSV '{}': {e}", path.display()),
        )
    })?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", RESULT_COLUMNS.join(","))
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to write results CSV header: {e}")))?;

    for r in rows {
        let p = &r.params;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            p.agonist_conc(),
            p.transmitter_conc(),
            p.ls(),
            p.hc(),
            p.e(),
            r.time_ms,
            r.point_estimate,
            r.fitted_value,
        )
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to write results CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(ErrorKind::Io, format!("Failed to flush results CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParameterSet;

    #[test]
    fn writes_header_then_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.csv");
        let params = ParameterSet::new(1.5, 2.0, -3.0, 4.0, 5.0);
        let rows = vec![
            ResultRow {
                params,
                time_ms: 0.0,
                point_estimate: 0.1,
                fitted_value: 0.125,
            },
            ResultRow {
                params,
                time_ms: 10.0,
                point_estimate: 0.2,
                fitted_value: 0.25,
            },
        ];

        write_results_csv(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "[AMPA],[T],Ls,Hc,E,time,AMPA.O-ML,AMPA.O-Final");
        assert_eq!(lines[1], "1.5,2,-3,4,5,0,0.1,0.125");
        assert_eq!(lines[2], "1.5,2,-3,4,5,10,0.2,0.25");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("result.csv");
        let err = write_results_csv(&path, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
