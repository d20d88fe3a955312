//! Reporting utilities: result rows and formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

pub mod format;

pub use format::*;

use crate::domain::{FittedCurveParameters, ResultRow, TimeSeriesPoint};
use crate::error::{AppError, ErrorKind};
use crate::models::evaluate;

/// Evaluate the fitted curve on every point, preserving input order.
pub fn assemble(
    points: &[TimeSeriesPoint],
    fitted: &FittedCurveParameters,
) -> Result<Vec<ResultRow>, AppError> {
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let point_estimate = p.point_estimate.ok_or_else(|| {
            AppError::new(
                ErrorKind::Session,
                format!("Row {i} (time={} ms) has no point estimate.", p.time_ms),
            )
        })?;

        let fitted_value = evaluate(p.time_seconds(), fitted);
        if !fitted_value.is_finite() {
            return Err(AppError::new(
                ErrorKind::Evaluation,
                format!(
                    "Fitted curve is not finite at time={} ms (denominator pole?).",
                    p.time_ms
                ),
            ));
        }

        out.push(ResultRow {
            params: p.params,
            time_ms: p.time_ms,
            point_estimate,
            fitted_value,
        });
    }
    Ok(out)
}

/// Sum of squared differences between point estimates and fitted values.
pub fn sum_squared_residuals(rows: &[ResultRow]) -> f64 {
    rows.iter()
        .map(|r| (r.point_estimate - r.fitted_value).powi(2))
        .sum()
}

/// Root-mean-square residual, `0.0` for no rows.
pub fn rmse(rows: &[ResultRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    (sum_squared_residuals(rows) / rows.len() as f64).sqrt()
}
