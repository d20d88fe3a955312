//! Least-squares kernels used by the nonlinear solver.
//!
//! Every iteration of the damped Gauss–Newton solver needs two small dense
//! linear-algebra operations:
//!
//! ```text
//! minimize ‖J δ - r‖² + λ‖δ‖²          (damped step)
//! ‖P_J r‖ / ‖(I - P_J) r‖              (relative-offset convergence test)
//! ```
//!
//! Implementation choices:
//! - The damped problem is solved as an ordinary least-squares problem on the
//!   augmented system `[J; √λ·I] δ = [r; 0]`.
//! - We use SVD so tall (more rows than columns) and near-singular systems
//!   are handled robustly. (Nalgebra's `QR::solve` is intended for square
//!   systems and will panic for non-square matrices.)

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `minimize ‖x δ - y‖² + λ‖δ‖²` (Levenberg–Marquardt step).
pub fn solve_damped_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    a.view_mut((0, 0), (n, p)).copy_from(x);
    let damping = lambda.max(0.0).sqrt();
    for j in 0..p {
        a[(n + j, j)] = damping;
    }

    let mut b = DVector::<f64>::zeros(n + p);
    b.rows_mut(0, n).copy_from(y);

    solve_least_squares(&a, &b)
}

/// Ratio of the part of `y` explained by the column space of `x` to the
/// unexplained part.
///
/// Returns `None` when the SVD does not converge. A zero numerator yields 0;
/// a zero denominator with a non-zero numerator yields `+inf`.
pub fn projection_ratio(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<f64> {
    let svd = x.clone().try_svd(true, false, f64::EPSILON, 0)?;
    let u = svd.u.as_ref()?;

    let sv_max = svd.singular_values.iter().cloned().fold(0.0_f64, f64::max);
    let cutoff = sv_max * f64::EPSILON * x.nrows().max(x.ncols()) as f64;

    let mut explained = 0.0;
    for (k, &sv) in svd.singular_values.iter().enumerate() {
        if sv > cutoff {
            let c = u.column(k).dot(y);
            explained += c * c;
        }
    }
    if explained == 0.0 {
        return Some(0.0);
    }
    let unexplained = (y.norm_squared() - explained).max(0.0);
    Some((explained / unexplained).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damping_shrinks_the_step() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let free = solve_damped_least_squares(&x, &y, 0.0).unwrap();
        let damped = solve_damped_least_squares(&x, &y, 100.0).unwrap();
        assert!((free[0] - 2.0).abs() < 1e-10);
        assert!(damped.norm() < free.norm());
    }

    #[test]
    fn projection_ratio_separates_explained_and_residual_parts() {
        // Column space is the first axis.
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 0.0]);
        let y = DVector::from_row_slice(&[3.0, 4.0]);
        let ratio = projection_ratio(&x, &y).unwrap();
        assert!((ratio - 0.75).abs() < 1e-12);

        let orthogonal = DVector::from_row_slice(&[0.0, 4.0]);
        assert_eq!(projection_ratio(&x, &orthogonal).unwrap(), 0.0);
    }
}
