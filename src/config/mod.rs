//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{load_config_file, render_config, save_config};
pub use paths::{
    artifacts_dir, base_weights_path, config_dir, config_file_path, data_dir, weights_path,
};
pub use types::{
    Config, ImageryConfig, InferenceConfig, InferenceDevice, ModelConfig, ServiceConfig,
    ThresholdsConfig,
};
pub use validate::validate_config;
