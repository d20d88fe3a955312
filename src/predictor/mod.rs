//! Point-prediction model and the adapter that applies it to the time grid.

pub mod adapter;
pub mod model;

pub use adapter::*;
pub use model::*;
