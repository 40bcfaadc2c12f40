//! Solarscan - rooftop solar panel detection from satellite imagery.
//!
//! Given a coordinate, the crate fetches (or synthesizes) a satellite raster,
//! runs a Mask R-CNN instance-segmentation model on it and converts the
//! detected panel pixels into square meters using Web-Mercator ground
//! resolution.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod geo;
pub mod imagery;
pub mod inference;
pub mod output;
pub mod pipeline;
pub mod service;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, GlobalArgs, ImageryAction};
use config::{Config, InferenceDevice, config_file_path, load_config_file, save_config};
use imagery::ImageryProvider;
use output::{ErrorResponse, write_batch_csv, write_report};
use pipeline::{ReportOptions, read_batch_locations, run_report};
use serde::Serialize;
use service::SolarService;
use std::path::Path;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the solarscan CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    let config_path = match &cli.global.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };

    if let Command::Config { action } = cli.command {
        return handle_config_command(action, &config_path);
    }

    let mut config = load_config_file(&config_path)?;
    apply_overrides(&mut config, &cli.global);
    config::validate_config(&config)?;

    handle_command(cli.command, &cli.global, &config, &config_path)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default because CUDA fallback is expected in auto mode.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // stdout carries JSON results only
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(weights) = &global.weights {
        config.model.weights = Some(weights.clone());
    }
    if let Some(base_weights) = &global.base_weights {
        config.model.base_weights = Some(base_weights.clone());
    }
    if let Some(dir) = &global.artifacts_dir {
        config.service.artifacts_dir = Some(dir.clone());
    }
    if global.cpu {
        config.inference.device = InferenceDevice::Cpu;
    } else if global.gpu {
        config.inference.device = InferenceDevice::Gpu;
    }
}

fn handle_command(
    command: Command,
    global: &GlobalArgs,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    let show_progress = !global.quiet;

    match command {
        Command::Health => {
            let service = SolarService::start(config, global.api_key.clone())?;
            print_json(&service.health())
        }
        Command::Infer {
            lat,
            lon,
            buffer_sqft,
            save_image,
        } => {
            let service = SolarService::start(config, global.api_key.clone())?;
            let outcome = if save_image {
                service
                    .infer_and_save(lat, lon, buffer_sqft)
                    .map(|(result, _)| result)
            } else {
                service.infer(lat, lon, buffer_sqft)
            };
            match outcome {
                Ok(result) => print_json(&result),
                Err(response) => emit_failure(&response),
            }
        }
        Command::Batch {
            input,
            csv_out,
            jobs,
        } => {
            let mut config = config.clone();
            if let Some(jobs) = jobs {
                config.service.batch_concurrency = usize::from(jobs);
            }
            handle_batch(&config, global, &input, csv_out.as_deref(), show_progress)
        }
        Command::Report {
            dir,
            output,
            min_confidence,
            fail_fast,
        } => {
            let service = SolarService::start(config, global.api_key.clone())?;
            let options = ReportOptions {
                min_confidence: min_confidence
                    .unwrap_or(config.thresholds.report_min_confidence),
                fail_fast,
                show_progress,
            };
            let summary = run_report(service.engine()?, &dir, options)?;
            write_report(&output, &summary.records)?;
            info!(
                "Wrote {} records to {}",
                summary.records.len(),
                output.display()
            );
            if summary.failed > 0 {
                warn!("{} image(s) could not be processed", summary.failed);
            }
            Ok(())
        }
        Command::Evaluate {
            dataset,
            min_confidence,
        } => {
            let service = SolarService::start(config, global.api_key.clone())?;
            let summary = evaluation::run_evaluation(
                service.engine()?,
                &dataset,
                min_confidence.unwrap_or(config.thresholds.evaluation_min_confidence),
                show_progress,
            )?;
            print_json(&summary)
        }
        Command::Imagery { action } => handle_imagery_command(action, global, config),
        Command::Config { action } => handle_config_command(action, config_path),
    }
}

fn handle_batch(
    config: &Config,
    global: &GlobalArgs,
    input: &Path,
    csv_out: Option<&Path>,
    show_progress: bool,
) -> Result<()> {
    let locations = read_batch_locations(input)?;
    info!("Loaded {} location(s) from {}", locations.len(), input.display());

    let service = SolarService::start(config, global.api_key.clone())?;
    match service.batch_infer(&locations, show_progress) {
        Ok(response) => {
            if let Some(path) = csv_out {
                write_batch_csv(path, &response.results)?;
                info!("Wrote CSV to {}", path.display());
            }
            print_json(&response)
        }
        Err(response) => emit_failure(&response),
    }
}

fn handle_imagery_command(action: ImageryAction, global: &GlobalArgs, config: &Config) -> Result<()> {
    match action {
        ImageryAction::Check => {
            let provider = ImageryProvider::from_config(&config.imagery, global.api_key.clone())?;
            let dir = config::artifacts_dir(config)?;
            let check = cli::imagery::check_key(&provider, &dir)?;
            print_json(&check)?;
            if check.valid {
                Ok(())
            } else {
                Err(Error::RequestFailed {
                    status: check.status.unwrap_or(0),
                    code: "imagery_check_failed",
                })
            }
        }
        ImageryAction::Fallback { output, size } => cli::imagery::write_fallback(&output, size),
    }
}

fn handle_config_command(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nSet SOLAR_API_KEY to enable live imagery.");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(path)?;
            print!("{}", config::render_config(&config)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Print the structured error record and fail with its status.
fn emit_failure(response: &ErrorResponse) -> Result<()> {
    print_json(response)?;
    Err(Error::RequestFailed {
        status: response.status,
        code: response.error,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| Error::JsonSerialize { source: e })?;
    println!("{json}");
    Ok(())
}
