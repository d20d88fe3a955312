//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - own the solver session and its lifecycle
//! - bind the predicted time series once per session
//! - run bounded restarts from random starting values

pub mod fitter;

pub use fitter::*;
