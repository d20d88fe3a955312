//! Synthetic time grid for one parameter set.
//!
//! The grid covers the simulated window `0..=10000` ms in steps of 10 ms.
//! Times are computed from an integer index so the grid never accumulates
//! floating-point drift.

use crate::domain::{ParameterSet, TimeSeriesPoint};

/// Number of samples in the grid.
pub const GRID_LEN: usize = 1001;
/// Spacing between samples (ms).
pub const GRID_STEP_MS: f64 = 10.0;
/// Last sample time (ms).
pub const GRID_END_MS: f64 = 10_000.0;

/// Generate the fixed time grid carrying `params` on every row.
pub fn synthesize(params: ParameterSet) -> Vec<TimeSeriesPoint> {
    (0..GRID_LEN)
        .map(|i| TimeSeriesPoint {
            time_ms: i as f64 * GRID_STEP_MS,
            params,
            point_estimate: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_fixed_shape() {
        let params = ParameterSet::new(0.5, 1.0, 200.0, 20.0, 0.02);
        let points = synthesize(params);

        assert_eq!(points.len(), GRID_LEN);
        assert_eq!(points[0].time_ms, 0.0);
        assert_eq!(points[GRID_LEN - 1].time_ms, GRID_END_MS);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.time_ms, (i * 10) as f64);
            assert_eq!(p.params, params);
            assert!(p.point_estimate.is_none());
        }
        assert!(points.windows(2).all(|w| w[1].time_ms > w[0].time_ms));
    }

    #[test]
    fn negative_inputs_are_carried_unchanged() {
        let params = ParameterSet::new(-1.0, 0.0, -2.5, 1e9, f64::MIN_POSITIVE);
        assert!(synthesize(params).iter().all(|p| p.params == params));
    }
}
