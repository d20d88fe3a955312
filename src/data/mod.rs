//! Input data generation.

pub mod grid;

pub use grid::*;
