//! Platform-specific configuration and data paths.

use crate::config::Config;
use crate::constants::{APP_NAME, model_io, service};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory for the current platform.
///
/// - Linux: `~/.config/solarscan/`
/// - macOS: `~/Library/Application Support/solarscan/`
/// - Windows: `%APPDATA%\solarscan\`
pub fn config_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the data directory (models, artifacts) for the current platform.
pub fn data_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(Error::DataDirNotFound)
}

/// Fine-tuned weights path: configured, else `<data_dir>/models/`.
pub fn weights_path(config: &Config) -> Result<PathBuf> {
    match &config.model.weights {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?
            .join(service::MODELS_DIR)
            .join(model_io::WEIGHTS_FILE)),
    }
}

/// Stock pretrained weights path: configured, else `<data_dir>/models/`.
pub fn base_weights_path(config: &Config) -> Result<PathBuf> {
    match &config.model.base_weights {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?
            .join(service::MODELS_DIR)
            .join(model_io::BASE_WEIGHTS_FILE)),
    }
}

/// Artifacts directory: configured, else `<data_dir>/artifacts`.
pub fn artifacts_dir(config: &Config) -> Result<PathBuf> {
    match &config.service.artifacts_dir {
        Some(path) => Ok(path.clone()),
        None => Ok(data_dir()?.join(service::ARTIFACTS_DIR)),
    }
}
