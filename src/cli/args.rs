//! CLI argument definitions.

use super::validators::{parse_confidence, parse_latitude, parse_longitude, parse_raster_size};
use crate::imagery::RasterSize;
use crate::constants::{imagery, report};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Rooftop solar panel detection from satellite imagery.
#[derive(Debug, Parser)]
#[command(name = "solarscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report liveness, device and model state as JSON.
    Health,
    /// Detect solar panels around one coordinate.
    Infer {
        /// Latitude (-90.0 to 90.0).
        #[arg(long, value_parser = parse_latitude, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude (-180.0 to 180.0).
        #[arg(long, value_parser = parse_longitude, allow_negative_numbers = true)]
        lon: f64,
        /// Buffer area in square feet (1200 or 2400; others fall back to 1200).
        #[arg(long)]
        buffer_sqft: Option<u32>,
        /// Save the analysed image to the artifacts directory.
        #[arg(long)]
        save_image: bool,
    },
    /// Run many coordinates from a JSON or CSV file.
    Batch {
        /// Input file (`.json` or CSV with lat/lon columns).
        input: PathBuf,
        /// Also write results as CSV.
        #[arg(long)]
        csv_out: Option<PathBuf>,
        /// Concurrent queries (overrides config).
        #[arg(short, long, env = "SOLARSCAN_JOBS",
              value_parser = clap::value_parser!(u16).range(1..))]
        jobs: Option<u16>,
    },
    /// Detect panels in a directory of images and write a JSON report.
    Report {
        /// Directory of PNG/JPEG images.
        dir: PathBuf,
        /// Output file.
        #[arg(short, long, default_value = report::DEFAULT_OUTPUT_FILE)]
        output: PathBuf,
        /// Confidence cutoff (overrides config).
        #[arg(short = 'c', long, value_parser = parse_confidence)]
        min_confidence: Option<f32>,
        /// Stop on first error.
        #[arg(long)]
        fail_fast: bool,
    },
    /// Compute mean IoU over a labelled dataset (`images/` + `labels/`).
    Evaluate {
        /// Dataset root.
        dataset: PathBuf,
        /// Top-detection cutoff (overrides config).
        #[arg(short = 'c', long, value_parser = parse_confidence)]
        min_confidence: Option<f32>,
    },
    /// Imagery provider utilities.
    Imagery {
        /// Imagery action to perform.
        #[command(subcommand)]
        action: ImageryAction,
    },
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Imagery subcommand actions.
#[derive(Debug, Subcommand)]
pub enum ImageryAction {
    /// Verify the API key by fetching a known location.
    Check,
    /// Write the offline fallback image.
    Fallback {
        /// Output PNG file.
        #[arg(short, long)]
        output: PathBuf,
        /// Image size as WIDTHxHEIGHT.
        #[arg(long, default_value = imagery::DEFAULT_SIZE, value_parser = parse_raster_size)]
        size: RasterSize,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config dir).
    #[arg(long, global = true, env = "SOLARSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Fine-tuned ONNX weights (overrides config).
    #[arg(long, global = true, env = "SOLARSCAN_WEIGHTS")]
    pub weights: Option<PathBuf>,

    /// Stock pretrained ONNX weights used when fine-tuned weights are missing.
    #[arg(long, global = true, env = "SOLARSCAN_BASE_WEIGHTS")]
    pub base_weights: Option<PathBuf>,

    /// Directory for saved query images (overrides config).
    #[arg(long, global = true, env = "SOLARSCAN_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Imagery provider API key.
    #[arg(long, global = true, env = "SOLAR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable CUDA GPU acceleration.
    #[arg(long, global = true, conflicts_with = "cpu")]
    pub gpu: bool,

    /// Force CPU inference.
    #[arg(long, global = true, conflicts_with = "gpu")]
    pub cpu: bool,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: full trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_infer() {
        let cli = Cli::try_parse_from([
            "solarscan",
            "infer",
            "--lat",
            "36.1699",
            "--lon",
            "-115.1398",
            "--buffer-sqft",
            "2400",
        ])
        .unwrap();
        match cli.command {
            Command::Infer {
                lat,
                lon,
                buffer_sqft,
                save_image,
            } => {
                assert_eq!(lat, 36.1699);
                assert_eq!(lon, -115.1398);
                assert_eq!(buffer_sqft, Some(2400));
                assert!(!save_image);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_out_of_range_latitude() {
        assert!(Cli::try_parse_from(["solarscan", "infer", "--lat", "999", "--lon", "0"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["solarscan", "health", "--cpu", "-vv"]).unwrap();
        assert!(cli.global.cpu);
        assert_eq!(cli.global.verbose, 2);
        assert!(Cli::try_parse_from(["solarscan", "health", "--cpu", "--gpu"]).is_err());
    }

    #[test]
    fn test_cli_parse_report_defaults() {
        let cli = Cli::try_parse_from(["solarscan", "report", "images"]).unwrap();
        match cli.command {
            Command::Report {
                dir,
                output,
                min_confidence,
                fail_fast,
            } => {
                assert_eq!(dir, PathBuf::from("images"));
                assert_eq!(output, PathBuf::from("predictions.json"));
                assert_eq!(min_confidence, None);
                assert!(!fail_fast);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_zero_jobs() {
        assert!(Cli::try_parse_from(["solarscan", "batch", "in.json", "--jobs", "0"]).is_err());
    }

    #[test]
    fn test_cli_parse_imagery_fallback() {
        let cli =
            Cli::try_parse_from(["solarscan", "imagery", "fallback", "-o", "out.png"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Imagery {
                action: ImageryAction::Fallback { .. }
            }
        ));
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        assert!(Cli::try_parse_from(["solarscan", "config", "show"]).is_ok());
    }
}
