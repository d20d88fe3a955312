//! Curve fit orchestration over an engine session.
//!
//! The fitter owns one engine session and walks it through a fixed sequence:
//!
//! ```text
//! Disconnected -> Connected -> DataBound -> Fitting -> {Fitted | FitFailed} -> Disconnected
//! ```
//!
//! - `connect` opens the session (version-checked)
//! - `bind_dataset` binds time (seconds) and the target column, once per session
//! - `build_formula` declares the template with solver-safe variable names
//! - `fit` runs bounded restarts, each from fresh uniform starting values
//! - `extract_coefficients` reads the 9 coefficients of a successful fit
//! - `disconnect` releases the session from any state (also on drop)

use std::fmt;

use rand::Rng;
use rand_distr::Open01;
use tracing::{debug, info, warn};

use crate::domain::{
    ATTR_TIME, COEFFICIENT_NAMES, FitControls, FitReport, FittedCurveParameters, TimeSeriesPoint,
};
use crate::engine::{
    ENGINE_API_VERSION, Engine, EngineError, Expr, Formula, Solution, SolveRequest, adapt,
};
use crate::error::{AppError, ErrorKind};

/// Name under which the fit formula is declared.
pub const FORMULA_NAME: &str = "ffit";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitState {
    Disconnected,
    Connected,
    DataBound,
    Fitting,
    Fitted,
    FitFailed,
}

/// Result of the restart loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitOutcome {
    /// The given 1-based attempt converged.
    Converged { attempts: usize },
    /// Every attempt failed.
    Exhausted { attempts: usize },
}

/// Orchestrator misuse or engine rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// The session could not be opened.
    Connect(String),
    AlreadyConnected,
    NotConnected,
    /// `build_formula`/`fit` before `bind_dataset`.
    NotBound,
    /// `fit` before `build_formula`.
    NoFormula,
    /// `extract_coefficients` without a successful fit.
    NotFitted,
    /// A point reached the fitter without a point estimate.
    MissingEstimate { index: usize },
    /// The template references a name that is not bound.
    UnknownVariable(String),
    /// The solution lacks one of the expected coefficients.
    MissingCoefficient(String),
    Engine(EngineError),
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitError::Connect(msg) => write!(f, "Cannot connect to the solver engine: {msg}"),
            FitError::AlreadyConnected => write!(f, "Solver session is already connected."),
            FitError::NotConnected => write!(f, "Solver session is not connected."),
            FitError::NotBound => write!(f, "No dataset bound to the solver session."),
            FitError::NoFormula => write!(f, "No fit formula declared."),
            FitError::NotFitted => write!(f, "No successful fit to read coefficients from."),
            FitError::MissingEstimate { index } => {
                write!(f, "Row {index} has no point estimate to fit against.")
            }
            FitError::UnknownVariable(name) => {
                write!(f, "Fit template references unbound variable '{name}'.")
            }
            FitError::MissingCoefficient(name) => {
                write!(f, "Solver result lacks coefficient '{name}'.")
            }
            FitError::Engine(e) => write!(f, "Solver engine error: {e}"),
        }
    }
}

impl std::error::Error for FitError {}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let kind = match err {
            FitError::Connect(_) => ErrorKind::EngineConnect,
            _ => ErrorKind::Session,
        };
        AppError::new(kind, err.to_string())
    }
}

/// Owns one engine session and the random source for starting values.
pub struct CurveFitter<E: Engine, R: Rng> {
    engine: E,
    rng: R,
    controls: FitControls,
    state: FitState,
    /// Adapted names of the bound independent variables; `Some` once bound.
    independents: Option<Vec<String>>,
    formula: Option<Formula>,
    solution: Option<(Solution, usize)>,
}

impl<E: Engine, R: Rng> CurveFitter<E, R> {
    pub fn new(engine: E, rng: R, controls: FitControls) -> Self {
        Self {
            engine,
            rng,
            controls,
            state: FitState::Disconnected,
            independents: None,
            formula: None,
            solution: None,
        }
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn formula(&self) -> Option<&Formula> {
        self.formula.as_ref()
    }

    /// Open the engine session.
    pub fn connect(&mut self) -> Result<(), FitError> {
        if self.state != FitState::Disconnected {
            return Err(FitError::AlreadyConnected);
        }
        let version = self.engine.api_version();
        if version != ENGINE_API_VERSION {
            return Err(FitError::Connect(format!(
                "engine speaks API version {version}, expected {ENGINE_API_VERSION}"
            )));
        }
        self.engine
            .open()
            .map_err(|e| FitError::Connect(e.to_string()))?;
        self.state = FitState::Connected;
        debug!("solver session connected");
        Ok(())
    }

    /// Bind the time column (seconds) and the `target` column.
    ///
    /// Runs once per session; later calls are no-ops, so the dataset must not
    /// change after the first call.
    pub fn bind_dataset(&mut self, points: &[TimeSeriesPoint], target: &str) -> Result<(), FitError> {
        if self.state == FitState::Disconnected {
            return Err(FitError::NotConnected);
        }
        if self.independents.is_some() {
            debug!("dataset already bound; skipping");
            return Ok(());
        }

        let time: Vec<f64> = points.iter().map(TimeSeriesPoint::time_seconds).collect();
        let estimates = points
            .iter()
            .enumerate()
            .map(|(index, p)| p.point_estimate.ok_or(FitError::MissingEstimate { index }))
            .collect::<Result<Vec<f64>, FitError>>()?;

        let mut independents = Vec::new();
        for (key, values) in [(ATTR_TIME, time), (target, estimates)] {
            let name = adapt(key);
            self.engine.bind(&name, values).map_err(FitError::Engine)?;
            if key != target {
                independents.push(name);
            }
        }

        debug!(rows = points.len(), ?independents, "dataset bound");
        self.independents = Some(independents);
        self.state = FitState::DataBound;
        Ok(())
    }

    /// Declare `template` with every variable renamed to its adapted form.
    pub fn build_formula(&mut self, template: &Expr, constants: &[&str]) -> Result<(), FitError> {
        let independents = self.independents.as_ref().ok_or(FitError::NotBound)?;

        let body = template.rename_vars(&adapt);
        if let Some(unknown) = body
            .variables()
            .into_iter()
            .find(|v| !independents.iter().any(|i| i.as_str() == *v))
        {
            return Err(FitError::UnknownVariable(unknown.to_string()));
        }

        let formula = Formula {
            name: FORMULA_NAME.to_string(),
            independents: independents.clone(),
            constants: constants.iter().map(|c| c.to_string()).collect(),
            body,
        };
        debug!(%formula, "fit formula");
        self.engine
            .declare(formula.clone())
            .map_err(FitError::Engine)?;
        self.formula = Some(formula);
        Ok(())
    }

    /// Fit `target ~ formula(...)` with up to `max_attempts` restarts.
    pub fn fit(&mut self, target: &str) -> Result<FitOutcome, FitError> {
        if self.independents.is_none() {
            return Err(FitError::NotBound);
        }
        let constants = self
            .formula
            .as_ref()
            .ok_or(FitError::NoFormula)?
            .constants
            .clone();

        self.state = FitState::Fitting;
        self.solution = None;
        let target = adapt(target);

        for attempt in 1..=self.controls.max_attempts {
            // Fresh starting values on every attempt.
            let start: Vec<(String, f64)> = constants
                .iter()
                .map(|c| (c.clone(), self.rng.sample(Open01)))
                .collect();
            let request = SolveRequest {
                target: target.clone(),
                start,
                controls: self.controls,
            };

            match self.engine.solve(&request) {
                Ok(solution) => {
                    info!(
                        attempt,
                        iterations = solution.iterations,
                        sse = solution.sse,
                        "curve fit converged"
                    );
                    self.solution = Some((solution, attempt));
                    self.state = FitState::Fitted;
                    return Ok(FitOutcome::Converged { attempts: attempt });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "curve fit attempt failed");
                }
            }
        }

        self.state = FitState::FitFailed;
        Ok(FitOutcome::Exhausted {
            attempts: self.controls.max_attempts,
        })
    }

    /// Read `p1..p5, q1..q4` from the successful fit.
    pub fn extract_coefficients(&self) -> Result<FitReport, FitError> {
        let (solution, attempts) = self.solution.as_ref().ok_or(FitError::NotFitted)?;

        let mut values = [0.0; 9];
        for (slot, name) in values.iter_mut().zip(COEFFICIENT_NAMES) {
            *slot = solution
                .coefficient(name)
                .ok_or_else(|| FitError::MissingCoefficient(name.to_string()))?;
        }

        Ok(FitReport {
            params: FittedCurveParameters::from_ordered(values),
            attempts: *attempts,
            iterations: solution.iterations,
            sse: solution.sse,
        })
    }

    /// Release the session. Safe from any state.
    pub fn disconnect(&mut self) {
        self.engine.close();
        self.independents = None;
        self.formula = None;
        self.solution = None;
        if self.state != FitState::Disconnected {
            debug!("solver session disconnected");
        }
        self.state = FitState::Disconnected;
    }
}

impl<E: Engine, R: Rng> Drop for CurveFitter<E, R> {
    fn drop(&mut self) {
        if self.state != FitState::Disconnected {
            self.disconnect();
        }
    }
}
