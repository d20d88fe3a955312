//! Command-line parsing for the AMPA activation curve fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! prediction/fitting code.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{FitControls, ParameterSet, RunConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ampa",
    version,
    about = "AMPA receptor activation curve fitter",
    override_usage = "ampa <MODEL> <[AMPA]> <[T]> <Ls> <Hc> <E> [OPTIONS]",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// Point-prediction model artifact (JSON).
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Agonist concentration.
    #[arg(value_name = "[AMPA]")]
    pub agonist: f64,

    /// Transmitter concentration.
    #[arg(value_name = "[T]")]
    pub transmitter: f64,

    #[arg(value_name = "Ls")]
    pub ls: f64,

    #[arg(value_name = "Hc")]
    pub hc: f64,

    #[arg(value_name = "E")]
    pub e: f64,

    /// Results CSV.
    #[arg(short = 'o', long, value_name = "CSV", default_value = "result.csv")]
    pub output: PathBuf,

    /// Seed for the starting-value generator (entropy-seeded when absent).
    #[arg(long, env = "AMPA_SEED")]
    pub seed: Option<u64>,

    /// Export the fitted curve (coefficients + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            model_path: self.model.clone(),
            params: ParameterSet::new(self.agonist, self.transmitter, self.ls, self.hc, self.e),
            output: self.output.clone(),
            seed: self.seed,
            controls: FitControls::default(),
            plot: self.plot,
            plot_width: self.width,
            plot_height: self.height,
            export_curve: self.export_curve.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_positionals_build_a_run_config() {
        let cli = Cli::try_parse_from(["ampa", "model.json", "1e-3", "2", "-0.5", "4", "5"]).unwrap();
        let config = cli.run_config();

        assert_eq!(config.model_path, PathBuf::from("model.json"));
        assert_eq!(config.params, ParameterSet::new(1e-3, 2.0, -0.5, 4.0, 5.0));
        assert_eq!(config.output, PathBuf::from("result.csv"));
        assert_eq!(config.controls, FitControls::default());
        assert!(!config.plot);
    }

    #[test]
    fn options_are_parsed() {
        let cli = Cli::try_parse_from([
            "ampa", "m.json", "1", "2", "3", "4", "5", "-o", "out.csv", "--seed", "7", "--plot",
            "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("out.csv"));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.plot);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn wrong_positional_count_is_rejected() {
        assert!(Cli::try_parse_from(["ampa", "m.json", "1", "2", "3", "4"]).is_err());
        assert!(Cli::try_parse_from(["ampa", "m.json", "1", "2", "3", "4", "5", "6"]).is_err());
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        assert!(Cli::try_parse_from(["ampa", "m.json", "1", "two", "3", "4", "5"]).is_err());
    }
}
