//! `ampa-curves` library crate.
//!
//! The binary (`ampa`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model, solver engine and random source can be swapped in tests

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod predictor;
pub mod report;
