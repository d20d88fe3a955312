//! Damped Gauss–Newton (Levenberg–Marquardt) iteration.
//!
//! Each iteration:
//!
//! 1. evaluates residuals `r = y - f(x; θ)` and the model Jacobian `J = ∂f/∂θ`
//! 2. checks convergence
//! 3. solves the column-scaled damped system `[J_s; √λ·I] δ = [r; 0]` and
//!    accepts the step only if it lowers the sum of squared residuals
//!
//! The step-scale factor is `min(1, 1/λ)`: accepted steps divide `λ` by 10,
//! rejected ones multiply it by 10.
//!
//! Convergence (success) is declared on any of:
//! - relative offset: `‖P_J r‖ / ‖(I - P_J) r‖ < tol`
//! - negligible residual: `‖r‖ <= tol·‖y‖` (zero-residual data never
//!   satisfies the relative-offset test)
//! - relative function convergence: an accepted step lowers SSE by less than `tol·SSE`
//! - x-convergence: a rejected trial step is smaller than `tol·(‖θ‖ + tol)`
//!
//! Failures: non-finite model at the start, singular gradient, step factor
//! below `min_factor`, or the iteration limit.

use nalgebra::{DMatrix, DVector};

use crate::domain::FitControls;
use crate::engine::{Compiled, EngineError};
use crate::math::{projection_ratio, solve_damped_least_squares};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;

/// A least-squares problem over bound data.
pub struct Problem<'a> {
    model: Compiled,
    /// `∂f/∂θ_j`, one per constant.
    gradient: Vec<Compiled>,
    /// Independent variable columns.
    columns: Vec<&'a [f64]>,
    y: &'a [f64],
}

/// Result of a converged iteration.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub theta: Vec<f64>,
    pub iterations: usize,
    pub sse: f64,
}

impl<'a> Problem<'a> {
    pub fn new(model: Compiled, gradient: Vec<Compiled>, columns: Vec<&'a [f64]>, y: &'a [f64]) -> Self {
        Self {
            model,
            gradient,
            columns,
            y,
        }
    }

    fn n_rows(&self) -> usize {
        self.y.len()
    }

    fn row(&self, i: usize, buf: &mut Vec<f64>) {
        buf.clear();
        buf.extend(self.columns.iter().map(|c| c[i]));
    }

    fn residuals(&self, theta: &[f64]) -> DVector<f64> {
        let mut x = Vec::with_capacity(self.columns.len());
        DVector::from_fn(self.n_rows(), |i, _| {
            self.row(i, &mut x);
            self.y[i] - self.model.eval(&x, theta)
        })
    }

    fn jacobian(&self, theta: &[f64]) -> DMatrix<f64> {
        let mut x = Vec::with_capacity(self.columns.len());
        let mut jac = DMatrix::<f64>::zeros(self.n_rows(), self.gradient.len());
        for i in 0..self.n_rows() {
            self.row(i, &mut x);
            for (j, g) in self.gradient.iter().enumerate() {
                jac[(i, j)] = g.eval(&x, theta);
            }
        }
        jac
    }
}

/// Run the iteration from `theta0`.
pub fn levenberg_marquardt(
    problem: &Problem<'_>,
    theta0: Vec<f64>,
    controls: &FitControls,
) -> Result<Outcome, EngineError> {
    let mut theta = DVector::from_vec(theta0);
    let mut r = problem.residuals(theta.as_slice());
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(EngineError::NonFiniteStart);
    }

    let y_scale: f64 = problem.y.iter().map(|v| v * v).sum();
    let zero_floor = controls.tol * controls.tol * y_scale;
    let converged = |theta: &DVector<f64>, iterations: usize, sse: f64| Outcome {
        theta: theta.iter().copied().collect(),
        iterations,
        sse,
    };

    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0usize;

    loop {
        if sse <= zero_floor {
            return Ok(converged(&theta, iterations, sse));
        }

        let jac = problem.jacobian(theta.as_slice());
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::SingularGradient);
        }

        // Scale columns to unit norm so λ acts uniformly on all constants.
        let scale = DVector::from_fn(jac.ncols(), |j, _| jac.column(j).norm());
        if scale.iter().all(|&s| s == 0.0) {
            return Err(EngineError::SingularGradient);
        }
        let scale = scale.map(|s| if s > 0.0 { s } else { 1.0 });
        let mut js = jac;
        for (j, s) in scale.iter().enumerate() {
            js.column_mut(j).unscale_mut(*s);
        }

        let offset = projection_ratio(&js, &r).ok_or(EngineError::SingularGradient)?;
        if offset < controls.tol {
            return Ok(converged(&theta, iterations, sse));
        }

        if iterations >= controls.max_iter {
            return Err(EngineError::IterationLimit {
                max_iter: controls.max_iter,
            });
        }
        iterations += 1;

        loop {
            let factor = (1.0 / lambda).min(1.0);
            if factor < controls.min_factor {
                return Err(EngineError::StepFactorBelowMin {
                    factor,
                    min_factor: controls.min_factor,
                });
            }

            let Some(step_scaled) = solve_damped_least_squares(&js, &r, lambda) else {
                lambda *= 10.0;
                continue;
            };
            let step = step_scaled.component_div(&scale);
            let candidate = &theta + &step;
            let r_new = problem.residuals(candidate.as_slice());
            let sse_new = r_new.norm_squared();

            if sse_new.is_finite() && sse_new < sse {
                let reduction = sse - sse_new;
                theta = candidate;
                r = r_new;
                sse = sse_new;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                if reduction <= controls.tol * (sse + reduction) {
                    return Ok(converged(&theta, iterations, sse));
                }
                break;
            }

            if step.norm() <= controls.tol * (theta.norm() + controls.tol) {
                return Ok(converged(&theta, iterations, sse));
            }
            lambda *= 10.0;
        }
    }
}
