//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place keeps the core workflow free of CLI concerns:
//! grid synthesis -> point prediction -> curve fit -> evaluation -> results file
//!
//! The model, engine and random source are injected so tests can drive the
//! whole pipeline with stubs and a fixed seed.

use rand::Rng;
use tracing::info;

use crate::data::synthesize;
use crate::domain::{ATTR_POINT_ESTIMATE, COEFFICIENT_NAMES, FitReport, ResultRow, RunConfig, TimeSeriesPoint};
use crate::engine::Engine;
use crate::error::{AppError, ErrorKind};
use crate::fit::{CurveFitter, FitOutcome};
use crate::predictor::PointModel;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub points: Vec<TimeSeriesPoint>,
    pub report: FitReport,
    pub rows: Vec<ResultRow>,
}

/// Execute the full pipeline and write the results file(s).
///
/// Nothing is written unless the fit converged and the fitted curve is finite
/// on every grid point.
pub fn run_fit<M, E, R>(config: &RunConfig, model: &M, engine: E, rng: R) -> Result<RunOutput, AppError>
where
    M: PointModel + ?Sized,
    E: Engine,
    R: Rng,
{
    // 1) Synthesize the time grid.
    info!("Generating new data...");
    let grid = synthesize(config.params);

    // 2) Attach point estimates.
    info!("Applying model...");
    let points = crate::predictor::predict(grid, model)?;

    // 3) Fit the rational curve to the point estimates.
    info!("Fitting curve...");
    let report = fit_curve(&points, engine, rng, config)?;

    // 4) Evaluate the fitted curve on the grid.
    let rows = crate::report::assemble(&points, &report.params)?;

    // 5) Persist.
    info!("Saving results...");
    crate::io::write_results_csv(&config.output, &rows)?;
    if let Some(path) = &config.export_curve {
        let curve = crate::io::curve_file(&config.params, &report, &rows);
        crate::io::write_curve_json(path, &curve)?;
    }

    Ok(RunOutput { points, report, rows })
}

fn fit_curve<E: Engine, R: Rng>(
    points: &[TimeSeriesPoint],
    engine: E,
    rng: R,
    config: &RunConfig,
) -> Result<FitReport, AppError> {
    let mut fitter = CurveFitter::new(engine, rng, config.controls);
    fitter.connect()?;
    fitter.bind_dataset(points, ATTR_POINT_ESTIMATE)?;
    fitter.build_formula(&crate::models::template(), &COEFFICIENT_NAMES)?;

    let report = match fitter.fit(ATTR_POINT_ESTIMATE)? {
        FitOutcome::Converged { .. } => fitter.extract_coefficients()?,
        FitOutcome::Exhausted { attempts } => {
            return Err(AppError::new(
                ErrorKind::FitExhausted,
                format!("ERROR: Curve fitting failed! ({attempts} attempts)"),
            ));
        }
    };
    fitter.disconnect();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitControls, ParameterSet, RESULT_COLUMNS};
    use crate::engine::{EngineError, Formula, NlsEngine, Solution, SolveRequest};
    use crate::models::evaluate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::Path;

    /// Ramp over the 10 s window: `time / 10000`.
    struct Ramp;

    impl PointModel for Ramp {
        fn predict(&self, features: &[f64; 6]) -> Result<f64, AppError> {
            Ok(features[5] / 10_000.0)
        }
    }

    struct Broken;

    impl PointModel for Broken {
        fn predict(&self, _: &[f64; 6]) -> Result<f64, AppError> {
            Err(AppError::new(ErrorKind::ModelInference, "no weights"))
        }
    }

    /// Engine whose solves always fail.
    #[derive(Default)]
    struct Diverging;

    impl Engine for Diverging {
        fn api_version(&self) -> u32 {
            crate::engine::ENGINE_API_VERSION
        }
        fn open(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
        fn close(&mut self) {}
        fn bind(&mut self, _: &str, _: Vec<f64>) -> Result<(), EngineError> {
            Ok(())
        }
        fn declare(&mut self, _: Formula) -> Result<(), EngineError> {
            Ok(())
        }
        fn solve(&mut self, _: &SolveRequest) -> Result<Solution, EngineError> {
            Err(EngineError::SingularGradient)
        }
    }

    fn config(dir: &Path) -> RunConfig {
        RunConfig {
            model_path: dir.join("model.json"),
            params: ParameterSet::new(1e-3, 1e-3, 0.5, 0.2, 0.8),
            output: dir.join("result.csv"),
            seed: Some(11),
            controls: FitControls::default(),
            plot: false,
            plot_width: 100,
            plot_height: 25,
            export_curve: None,
        }
    }

    #[test]
    fn ramp_is_fitted_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let out = run_fit(&cfg, &Ramp, NlsEngine::new(), StdRng::seed_from_u64(11)).unwrap();

        assert_eq!(out.rows.len(), 1001);
        for row in &out.rows {
            let ramp = row.time_ms / 10_000.0;
            assert_eq!(row.point_estimate, ramp);
            assert!(
                (row.fitted_value - ramp).abs() < 1e-3,
                "time={} fitted={}",
                row.time_ms,
                row.fitted_value
            );
            assert_eq!(row.fitted_value, evaluate(row.time_ms / 1000.0, &out.report.params));
        }
        assert!(out.report.attempts >= 1 && out.report.attempts <= 5);

        let text = std::fs::read_to_string(&cfg.output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1002);
        assert_eq!(lines[0], RESULT_COLUMNS.join(","));
        assert!(lines[1].starts_with("0.001,0.001,0.5,0.2,0.8,0,0,"));
        assert!(lines[1001].starts_with("0.001,0.001,0.5,0.2,0.8,10000,1,"));
    }

    #[test]
    fn curve_json_is_exported_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.export_curve = Some(dir.path().join("curve.json"));

        let out = run_fit(&cfg, &Ramp, NlsEngine::new(), StdRng::seed_from_u64(5)).unwrap();

        let curve = crate::io::read_curve_json(&dir.path().join("curve.json")).unwrap();
        assert_eq!(curve.coefficients, out.report.params);
        assert_eq!(curve.grid.time_ms.len(), 1001);
        assert_eq!(curve.time_unit, "s");
    }

    #[test]
    fn exhausted_fit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.export_curve = Some(dir.path().join("curve.json"));

        let err = run_fit(&cfg, &Ramp, Diverging, StdRng::seed_from_u64(0)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FitExhausted);
        assert_eq!(err.exit_code(), 2);
        assert!(!cfg.output.exists());
        assert!(!dir.path().join("curve.json").exists());
    }

    #[test]
    fn inference_failure_aborts_before_fitting() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let err = run_fit(&cfg, &Broken, Diverging, StdRng::seed_from_u64(0)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ModelInference);
        assert_eq!(err.exit_code(), 1);
        assert!(!cfg.output.exists());
    }
}
