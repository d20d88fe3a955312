//! Closed-form curve models.
//!
//! Models are implemented as small, pure functions so that fitting and
//! reporting code can stay generic.

pub mod rational;

pub use rational::*;
