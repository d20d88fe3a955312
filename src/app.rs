//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the point-prediction model
//! - runs the prediction + fit pipeline
//! - prints the summary and optional plot

use std::ffi::OsString;

use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::domain::RunConfig;
use crate::engine::NlsEngine;
use crate::error::{AppError, ErrorKind};
use crate::predictor::ModelArtifact;

pub mod pipeline;

/// Usage line printed with argument errors.
pub const USAGE: &str = "Arguments: <ML model file> <[AMPA]> <[T]> <Ls> <Hc> <E>";

/// Entry point for the `ampa` binary.
pub fn run() -> Result<(), AppError> {
    // `AMPA_SEED` may come from a local `.env`.
    dotenvy::dotenv().ok();

    let Some(cli) = parse_args(std::env::args_os())? else {
        return Ok(());
    };

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    handle_run(cli.run_config())
}

/// Parse argv. `Ok(None)` means help or version was printed.
pub fn parse_args<I, T>(args: I) -> Result<Option<Cli>, AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{err}");
                Ok(None)
            }
            _ => Err(AppError::new(
                ErrorKind::Argument,
                format!("{}\n{USAGE}", err.to_string().trim_end()),
            )),
        },
    }
}

fn handle_run(config: RunConfig) -> Result<(), AppError> {
    info!("Loading the model...");
    let model = ModelArtifact::load(&config.model_path)?;

    let rng = match config.seed {
        Some(seed) => {
            debug!(seed, "seeded starting values");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let run = pipeline::run_fit(&config, &model, NlsEngine::new(), rng)?;

    println!(
        "{}",
        crate::report::format_run_summary(&config.params, &run.report, &run.rows, &config.output)
    );
    if config.plot {
        println!(
            "{}",
            crate::plot::render_ascii_plot(&run.rows, config.plot_width, config.plot_height)
        );
    }

    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_arguments_carry_usage_and_exit_one() {
        let err = parse_args(["ampa", "model.json", "1", "2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().ends_with(USAGE));

        let err = parse_args(["ampa", "model.json", "1", "x", "3", "4", "5"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn help_and_version_are_not_errors() {
        assert!(parse_args(["ampa", "--help"]).unwrap().is_none());
        assert!(parse_args(["ampa", "--version"]).unwrap().is_none());
    }

    #[test]
    fn missing_model_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("absent.json");
        let output = dir.path().join("result.csv");
        let cli = parse_args([
            "ampa".into(),
            model.into_os_string(),
            "1".into(),
            "1".into(),
            "1".into(),
            "1".into(),
            "1".into(),
            "-o".into(),
            output.clone().into_os_string(),
        ])
        .unwrap()
        .unwrap();

        let err = handle_run(cli.run_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModelLoad);
        assert!(!output.exists());
    }

    #[test]
    fn linear_model_artifact_runs_the_whole_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.json");
        std::fs::write(
            &model,
            r#"{"kind":"linear","intercept":0.0,"weights":[0.0,0.0,0.0,0.0,0.0,0.0001]}"#,
        )
        .unwrap();
        let output = dir.path().join("result.csv");

        let mut config = parse_args(["ampa", "m.json", "1", "1", "1", "1", "1", "--seed", "3"])
            .unwrap()
            .unwrap()
            .run_config();
        config.model_path = model;
        config.output = output.clone();

        handle_run(config).unwrap();
        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 1002);
    }
}
