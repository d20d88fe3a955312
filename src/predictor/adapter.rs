//! Apply a point-prediction model to every grid row.

use tracing::debug;

use crate::domain::TimeSeriesPoint;
use crate::error::{AppError, ErrorKind};
use crate::predictor::PointModel;

/// Fill `point_estimate` on every point.
///
/// The first failure aborts the whole pass; no partially filled grid is
/// returned.
pub fn predict<M: PointModel + ?Sized>(
    points: Vec<TimeSeriesPoint>,
    model: &M,
) -> Result<Vec<TimeSeriesPoint>, AppError> {
    let mut out = Vec::with_capacity(points.len());
    for mut point in points {
        let features = point.params.features_at(point.time_ms);
        let label = model.predict(&features).map_err(|e| {
            AppError::new(
                ErrorKind::ModelInference,
                format!("Model inference failed at time={} ms: {e}", point.time_ms),
            )
        })?;
        if !label.is_finite() {
            return Err(AppError::new(
                ErrorKind::ModelInference,
                format!("Model returned a non-finite estimate at time={} ms.", point.time_ms),
            ));
        }
        point.point_estimate = Some(label);
        out.push(point);
    }
    debug!(rows = out.len(), "point estimates computed");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthesize;
    use crate::domain::ParameterSet;

    struct TimeEcho;

    impl PointModel for TimeEcho {
        fn predict(&self, x: &[f64; 6]) -> Result<f64, AppError> {
            Ok(x[5] + x[0])
        }
    }

    struct FailsAfter(f64);

    impl PointModel for FailsAfter {
        fn predict(&self, x: &[f64; 6]) -> Result<f64, AppError> {
            if x[5] > self.0 {
                Err(AppError::new(ErrorKind::ModelInference, "boom"))
            } else {
                Ok(0.0)
            }
        }
    }

    #[test]
    fn fills_every_row_in_feature_order() {
        let points = synthesize(ParameterSet::new(0.5, 1.0, 2.0, 3.0, 4.0));
        let out = predict(points, &TimeEcho).unwrap();
        assert_eq!(out.len(), 1001);
        for p in &out {
            assert_eq!(p.point_estimate, Some(p.time_ms + 0.5));
        }
    }

    #[test]
    fn any_failure_aborts() {
        let points = synthesize(ParameterSet::new(0.5, 1.0, 2.0, 3.0, 4.0));
        let err = predict(points, &FailsAfter(5000.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelInference);
        assert!(err.to_string().contains("5010"));
    }

    #[test]
    fn non_finite_label_is_an_inference_error() {
        struct Nan;
        impl PointModel for Nan {
            fn predict(&self, _: &[f64; 6]) -> Result<f64, AppError> {
                Ok(f64::NAN)
            }
        }
        let points = synthesize(ParameterSet::new(0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(predict(points, &Nan).unwrap_err().kind(), ErrorKind::ModelInference);
    }
}
