//! Mathematical utilities: dense least-squares kernels.

pub mod ols;

pub use ols::*;
