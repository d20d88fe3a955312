//! In-process nonlinear least-squares engine.
//!
//! The engine keeps a small workspace of named arrays and one declared
//! formula per session. Only one session can be live in the process: opening
//! takes a process-wide lock that is held until the session is closed (or the
//! engine is dropped), so a second `open` on another thread waits for the
//! first session to end. A second `open` on the thread that already holds the
//! session would wait forever and is refused with [`EngineError::Unavailable`].

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};

use crate::engine::lm::{Problem, levenberg_marquardt};
use crate::engine::{ENGINE_API_VERSION, Engine, EngineError, Formula, Solution, SolveRequest};

static SESSION_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    /// Whether this thread holds `SESSION_LOCK`.
    static HOLDS_SESSION: Cell<bool> = const { Cell::new(false) };
}

#[derive(Default)]
pub struct NlsEngine {
    session: Option<MutexGuard<'static, ()>>,
    workspace: HashMap<String, Vec<f64>>,
    formula: Option<Formula>,
}

impl NlsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(EngineError::NotOpen)
        }
    }

    fn column(&self, name: &str) -> Result<&[f64], EngineError> {
        self.workspace
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::Unbound(name.to_string()))
    }
}

impl Engine for NlsEngine {
    fn api_version(&self) -> u32 {
        ENGINE_API_VERSION
    }

    fn open(&mut self) -> Result<(), EngineError> {
        if self.is_open() {
            return Err(EngineError::AlreadyOpen);
        }
        if HOLDS_SESSION.with(Cell::get) {
            return Err(EngineError::Unavailable(
                "another session is open on this thread".to_string(),
            ));
        }
        // The lock guards no data, so a panic in another session leaves
        // nothing inconsistent behind.
        let guard = SESSION_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.session = Some(guard);
        HOLDS_SESSION.with(|held| held.set(true));
        debug!("engine session opened");
        Ok(())
    }

    fn close(&mut self) {
        self.workspace.clear();
        self.formula = None;
        if self.session.take().is_some() {
            HOLDS_SESSION.with(|held| held.set(false));
            debug!("engine session closed");
        }
    }

    fn bind(&mut self, name: &str, values: Vec<f64>) -> Result<(), EngineError> {
        self.ensure_open()?;
        trace!(name, len = values.len(), "bind");
        self.workspace.insert(name.to_string(), values);
        Ok(())
    }

    fn declare(&mut self, formula: Formula) -> Result<(), EngineError> {
        self.ensure_open()?;
        debug!(%formula, "declare");
        self.formula = Some(formula);
        Ok(())
    }

    fn solve(&mut self, request: &SolveRequest) -> Result<Solution, EngineError> {
        self.ensure_open()?;
        let formula = self.formula.as_ref().ok_or(EngineError::NoFormula)?;

        let y = self.column(&request.target)?;
        let mut columns = Vec::with_capacity(formula.independents.len());
        for name in &formula.independents {
            let col = self.column(name)?;
            if col.len() != y.len() {
                return Err(EngineError::LengthMismatch {
                    name: name.clone(),
                    expected: y.len(),
                    found: col.len(),
                });
            }
            columns.push(col);
        }

        let theta0 = formula
            .constants
            .iter()
            .map(|c| {
                request
                    .start
                    .iter()
                    .find(|(n, _)| n == c)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| EngineError::MissingStart(c.clone()))
            })
            .collect::<Result<Vec<f64>, EngineError>>()?;

        let model = formula
            .body
            .compile(&formula.independents, &formula.constants)
            .map_err(EngineError::UnknownSymbol)?;
        let gradient = formula
            .constants
            .iter()
            .map(|c| {
                formula
                    .body
                    .derivative(c)
                    .compile(&formula.independents, &formula.constants)
                    .map_err(EngineError::UnknownSymbol)
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let problem = Problem::new(model, gradient, columns, y);
        let outcome = levenberg_marquardt(&problem, theta0, &request.controls)?;

        Ok(Solution {
            coefficients: formula
                .constants
                .iter()
                .cloned()
                .zip(outcome.theta)
                .collect(),
            iterations: outcome.iterations,
            sse: outcome.sse,
        })
    }
}

impl Drop for NlsEngine {
    fn drop(&mut self) {
        self.close();
    }
}
