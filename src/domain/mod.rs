//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed physicochemical inputs (`ParameterSet`)
//! - the time grid rows (`TimeSeriesPoint`) and output rows (`ResultRow`)
//! - fit outputs (`FittedCurveParameters`, `FitReport`, `CurveFile`)

pub mod types;

pub use types::*;
