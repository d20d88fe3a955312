//! Nonlinear least-squares solving engine.
//!
//! The curve fitter talks to the engine only through the [`Engine`] trait:
//!
//! - open / close a session
//! - bind named numeric arrays into the session workspace
//! - declare a formula over bound names and free constants
//! - run a controlled nonlinear least-squares solve
//!
//! [`NlsEngine`] is the in-process implementation. Tests substitute stub
//! engines through the same trait.

pub mod expr;
pub mod lm;
pub mod nls;
pub mod symbols;

pub use expr::*;
pub use nls::*;
pub use symbols::*;

use std::fmt;

use crate::domain::FitControls;

/// API version spoken by the engines in this crate.
pub const ENGINE_API_VERSION: u32 = 1;

/// A formula declared in a session: `name(independents, constants) = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub name: String,
    /// Bound column names, in call order.
    pub independents: Vec<String>,
    /// Free constants, in call order.
    pub constants: Vec<String>,
    pub body: Expr,
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self
            .independents
            .iter()
            .chain(self.constants.iter())
            .map(String::as_str)
            .collect();
        write!(f, "{}({}) = {}", self.name, params.join(","), self.body)
    }
}

/// One solve of `target ~ formula(independents, constants)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    pub target: String,
    /// Starting value per constant.
    pub start: Vec<(String, f64)>,
    pub controls: FitControls,
}

/// A converged solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Estimated constants, in the formula's constant order.
    pub coefficients: Vec<(String, f64)>,
    pub iterations: usize,
    pub sse: f64,
}

impl Solution {
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.coefficients
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Failures reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine cannot be reached or refused the session.
    Unavailable(String),
    /// An operation needs an open session.
    NotOpen,
    /// A session is already open on this engine.
    AlreadyOpen,
    /// A name referenced by the request is not bound.
    Unbound(String),
    /// Bound arrays differ in length.
    LengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// `solve` was called before `declare`.
    NoFormula,
    /// The formula references a symbol the session cannot resolve.
    UnknownSymbol(String),
    /// No starting value was supplied for a constant.
    MissingStart(String),
    /// The model is not finite at the starting values.
    NonFiniteStart,
    /// The gradient is zero or non-finite.
    SingularGradient,
    /// The step-scale factor dropped below the configured minimum.
    StepFactorBelowMin { factor: f64, min_factor: f64 },
    /// The iteration limit was reached without convergence.
    IterationLimit { max_iter: usize },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unavailable(msg) => write!(f, "engine unavailable: {msg}"),
            EngineError::NotOpen => write!(f, "no open engine session"),
            EngineError::AlreadyOpen => write!(f, "engine session already open"),
            EngineError::Unbound(name) => write!(f, "'{name}' is not bound in the session"),
            EngineError::LengthMismatch {
                name,
                expected,
                found,
            } => write!(f, "'{name}' has {found} values, expected {expected}"),
            EngineError::NoFormula => write!(f, "no formula declared"),
            EngineError::UnknownSymbol(name) => write!(f, "formula references unknown symbol '{name}'"),
            EngineError::MissingStart(name) => write!(f, "no starting value for '{name}'"),
            EngineError::NonFiniteStart => {
                write!(f, "missing value or an infinity produced when evaluating the model")
            }
            EngineError::SingularGradient => write!(f, "singular gradient"),
            EngineError::StepFactorBelowMin { factor, min_factor } => write!(
                f,
                "step factor {factor:e} reduced below minFactor of {min_factor:e}"
            ),
            EngineError::IterationLimit { max_iter } => write!(
                f,
                "iteration limit reached without convergence ({max_iter})"
            ),
        }
    }
}

impl std::error::Error for EngineError {}

/// Capability set of a nonlinear least-squares engine.
pub trait Engine {
    /// Protocol version; the fitter refuses to talk to a mismatched engine.
    fn api_version(&self) -> u32;

    fn open(&mut self) -> Result<(), EngineError>;

    /// Release the session. Calling it on a closed engine is a no-op.
    fn close(&mut self);

    fn bind(&mut self, name: &str, values: Vec<f64>) -> Result<(), EngineError>;

    fn declare(&mut self, formula: Formula) -> Result<(), EngineError>;

    fn solve(&mut self, request: &SolveRequest) -> Result<Solution, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_display_lists_call_signature() {
        let formula = Formula {
            name: "ffit".to_string(),
            independents: vec!["time".to_string()],
            constants: vec!["k".to_string()],
            body: Expr::constant("k") * Expr::var("time"),
        };
        assert_eq!(formula.to_string(), "ffit(time,k) = k*time");
    }
}
