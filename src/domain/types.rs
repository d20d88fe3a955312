//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during prediction and fitting
//! - exported to CSV/JSON
//! - reloaded later for plotting

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute name of the agonist concentration column.
pub const ATTR_AGONIST: &str = "[AMPA]";
/// Attribute name of the transmitter concentration column.
pub const ATTR_TRANSMITTER: &str = "[T]";
pub const ATTR_LS: &str = "Ls";
pub const ATTR_HC: &str = "Hc";
pub const ATTR_E: &str = "E";
/// Simulated time in milliseconds.
pub const ATTR_TIME: &str = "time";
/// Point estimate produced by the predictive model.
pub const ATTR_POINT_ESTIMATE: &str = "AMPA.O-ML";
/// Value of the fitted closed-form curve.
pub const ATTR_FITTED: &str = "AMPA.O-Final";

/// Output column order. Fixed regardless of internal processing order.
pub const RESULT_COLUMNS: [&str; 8] = [
    ATTR_AGONIST,
    ATTR_TRANSMITTER,
    ATTR_LS,
    ATTR_HC,
    ATTR_E,
    ATTR_TIME,
    ATTR_POINT_ESTIMATE,
    ATTR_FITTED,
];

/// Fixed physicochemical inputs of one run.
///
/// Fields are private so a constructed set cannot be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    agonist_conc: f64,
    transmitter_conc: f64,
    ls: f64,
    hc: f64,
    e: f64,
}

impl ParameterSet {
    pub fn new(agonist_conc: f64, transmitter_conc: f64, ls: f64, hc: f64, e: f64) -> Self {
        Self {
            agonist_conc,
            transmitter_conc,
            ls,
            hc,
            e,
        }
    }

    pub fn agonist_conc(&self) -> f64 {
        self.agonist_conc
    }

    pub fn transmitter_conc(&self) -> f64 {
        self.transmitter_conc
    }

    pub fn ls(&self) -> f64 {
        self.ls
    }

    pub fn hc(&self) -> f64 {
        self.hc
    }

    pub fn e(&self) -> f64 {
        self.e
    }

    /// Feature vector in model order: `[AMPA], [T], Ls, Hc, E, time`.
    pub fn features_at(&self, time_ms: f64) -> [f64; 6] {
        [
            self.agonist_conc,
            self.transmitter_conc,
            self.ls,
            self.hc,
            self.e,
            time_ms,
        ]
    }
}

/// One sample of the simulated time window.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    /// Time in milliseconds.
    pub time_ms: f64,
    pub params: ParameterSet,
    /// Model output; `None` until the point-prediction adapter has run.
    pub point_estimate: Option<f64>,
}

impl TimeSeriesPoint {
    /// Time normalized to seconds, the scale the curve is fitted on.
    pub fn time_seconds(&self) -> f64 {
        self.time_ms / 1000.0
    }
}

/// Coefficient names in the order they are reported by the solver.
pub const COEFFICIENT_NAMES: [&str; 9] = ["p1", "p2", "p3", "p4", "p5", "q1", "q2", "q3", "q4"];

/// Coefficients of the rational approximant.
///
/// `p` holds the numerator coefficients (highest power first), `q` the
/// non-leading denominator coefficients (the `t⁴` term is fixed to 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedCurveParameters {
    pub p: [f64; 5],
    pub q: [f64; 4],
}

impl FittedCurveParameters {
    /// Build from the 9 coefficients in `p1..p5, q1..q4` order.
    pub fn from_ordered(values: [f64; 9]) -> Self {
        Self {
            p: [values[0], values[1], values[2], values[3], values[4]],
            q: [values[5], values[6], values[7], values[8]],
        }
    }

    pub fn to_ordered(&self) -> [f64; 9] {
        [
            self.p[0], self.p[1], self.p[2], self.p[3], self.p[4], self.q[0], self.q[1], self.q[2],
            self.q[3],
        ]
    }
}

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub params: ParameterSet,
    pub time_ms: f64,
    pub point_estimate: f64,
    pub fitted_value: f64,
}

/// Controls for the nonlinear least-squares fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitControls {
    /// Number of independent restarts before giving up.
    pub max_attempts: usize,
    /// Smallest step-scale factor before a solve is abandoned.
    pub min_factor: f64,
    /// Convergence tolerance (relative offset).
    pub tol: f64,
    /// Iteration limit per solve.
    pub max_iter: usize,
}

impl Default for FitControls {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_factor: 1e-8,
            tol: 1e-6,
            max_iter: 1000,
        }
    }
}

/// A successful fit with its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub params: FittedCurveParameters,
    /// 1-based attempt that converged.
    pub attempts: usize,
    pub iterations: usize,
    pub sse: f64,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model_path: PathBuf,
    pub params: ParameterSet,
    pub output: PathBuf,
    pub seed: Option<u64>,
    pub controls: FitControls,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_curve: Option<PathBuf>,
}

/// Fit diagnostics stored in a curve file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub attempts: usize,
    pub iterations: usize,
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub inputs: ParameterSet,
    /// Unit of `t` expected by the coefficients.
    pub time_unit: String,
    pub coefficients: FittedCurveParameters,
    pub fit_quality: FitQuality,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time_ms: Vec<f64>,
    pub fitted: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_coefficients_round_trip_positions() {
        let c = FittedCurveParameters::from_ordered([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(c.p, [1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(c.q, [6.0, 7.0, 8.0, 9.0]);
        assert_eq!(c.to_ordered()[5], 6.0);
    }

    #[test]
    fn features_follow_model_order() {
        let p = ParameterSet::new(1.0, 2.0, 3.0, 4.0, 5.0);
        assert_eq!(p.features_at(60.0), [1.0, 2.0, 3.0, 4.0, 5.0, 60.0]);
    }
}
