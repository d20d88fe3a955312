//! Rational (Padé-like) approximant used as the closed-form activation curve.
//!
//! ```text
//! y(t) = (p1·t⁴ + p2·t³ + p3·t² + p4·t + p5) / (t⁴ + q1·t³ + q2·t² + q3·t + q4)
//! ```
//!
//! `t` is in **seconds**, the same scale the coefficients were fitted on.
//!
//! No guard is applied to the denominator: a pole inside the evaluated range
//! yields `±inf` or `NaN`, and callers decide what to do with non-finite
//! values (the result assembler rejects them).

use crate::domain::{ATTR_TIME, COEFFICIENT_NAMES, FittedCurveParameters};
use crate::engine::Expr;

/// Evaluate the approximant at `t_seconds`.
pub fn evaluate(t_seconds: f64, params: &FittedCurveParameters) -> f64 {
    let [p1, p2, p3, p4, p5] = params.p;
    let [q1, q2, q3, q4] = params.q;
    let t = t_seconds;

    // Horner form of both quartics.
    let numer = (((p1 * t + p2) * t + p3) * t + p4) * t + p5;
    let denom = (((t + q1) * t + q2) * t + q3) * t + q4;
    numer / denom
}

/// The approximant as a fit template over the `time` attribute.
///
/// Constants are named `p1..p5, q1..q4` (see [`COEFFICIENT_NAMES`]).
pub fn template() -> Expr {
    let t = || Expr::var(ATTR_TIME);
    let c = |i: usize| Expr::constant(COEFFICIENT_NAMES[i]);

    let numer = c(0) * t().powi(4) + c(1) * t().powi(3) + c(2) * t().powi(2) + c(3) * t() + c(4);
    let denom = t().powi(4) + c(5) * t().powi(3) + c(6) * t().powi(2) + c(7) * t() + c(8);
    numer / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: [f64; 9]) -> FittedCurveParameters {
        FittedCurveParameters::from_ordered(values)
    }

    #[test]
    fn leading_terms_only_is_identically_one() {
        let c = params([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        for &t in &[1e-3, 0.01, 0.5, 1.0, 2.5, 10.0, -3.0] {
            let y = evaluate(t, &c);
            assert!((y - 1.0).abs() < 1e-12, "t={t} gave {y}");
        }
    }

    #[test]
    fn matches_expanded_polynomial_form() {
        let c = params([0.3, -1.2, 2.0, 0.7, 0.1, 0.5, 1.5, 2.5, 3.5]);
        let t: f64 = 1.7;
        let numer = 0.3 * t.powi(4) - 1.2 * t.powi(3) + 2.0 * t.powi(2) + 0.7 * t + 0.1;
        let denom = t.powi(4) + 0.5 * t.powi(3) + 1.5 * t.powi(2) + 2.5 * t + 3.5;
        assert!((evaluate(t, &c) - numer / denom).abs() < 1e-12);
    }

    #[test]
    fn at_zero_reduces_to_constant_ratio() {
        let c = params([9.0, 9.0, 9.0, 9.0, 2.0, 9.0, 9.0, 9.0, 4.0]);
        assert_eq!(evaluate(0.0, &c), 0.5);
    }

    #[test]
    fn zero_denominator_propagates_non_finite() {
        let c = params([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!evaluate(0.0, &c).is_finite());
    }

    #[test]
    fn template_prints_as_the_closed_form() {
        assert_eq!(
            template().to_string(),
            "(p1*time^4+p2*time^3+p3*time^2+p4*time+p5)/(time^4+q1*time^3+q2*time^2+q3*time+q4)"
        );
        assert_eq!(template().constants(), COEFFICIENT_NAMES.to_vec());
        assert_eq!(template().variables(), vec![ATTR_TIME]);
    }

    #[test]
    fn template_agrees_with_evaluate() {
        let values = [0.2, -0.4, 1.1, 0.9, 0.3, 0.6, 1.4, 2.2, 0.8];
        let consts: Vec<String> = COEFFICIENT_NAMES.iter().map(|s| s.to_string()).collect();
        let compiled = template().compile(&[ATTR_TIME.to_string()], &consts).unwrap();
        let c = FittedCurveParameters::from_ordered(values);
        for &t in &[0.0, 0.5, 3.0, 10.0] {
            assert!((compiled.eval(&[t], &values) - evaluate(t, &c)).abs() < 1e-12);
        }
    }
}
