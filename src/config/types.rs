//! Configuration type definitions.

use crate::constants::{imagery, service, thresholds};
use crate::error::Result;
use crate::imagery::RasterSize;
use crate::inference::DetectionThresholds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model weights.
    pub model: ModelConfig,

    /// Imagery provider settings.
    pub imagery: ImageryConfig,

    /// Calibration thresholds.
    pub thresholds: ThresholdsConfig,

    /// Inference settings.
    pub inference: InferenceConfig,

    /// Service settings.
    pub service: ServiceConfig,
}

/// Model weight locations.
///
/// Unset paths resolve to files under the platform data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Fine-tuned solar panel weights (ONNX).
    pub weights: Option<PathBuf>,

    /// Stock pretrained weights used when the fine-tuned file is missing.
    pub base_weights: Option<PathBuf>,
}

/// Imagery provider settings. The API key is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    /// Static map endpoint.
    pub endpoint: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Raster size as `WIDTHxHEIGHT`.
    pub image_size: String,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            endpoint: imagery::STATIC_MAP_ENDPOINT.to_string(),
            timeout_secs: imagery::DEFAULT_TIMEOUT_SECS,
            image_size: imagery::DEFAULT_SIZE.to_string(),
        }
    }
}

impl ImageryConfig {
    /// Parsed raster size.
    pub fn raster_size(&self) -> Result<RasterSize> {
        self.image_size.parse()
    }
}

/// Detection and reporting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Raw instance score floor.
    pub score: f32,

    /// NMS IoU cutoff.
    pub nms: f32,

    /// Soft-mask binarization cutoff.
    pub mask: f32,

    /// Cutoff for the single-query and batch interfaces.
    pub live_min_confidence: f32,

    /// Cutoff for the offline report.
    pub report_min_confidence: f32,

    /// Top-detection cutoff for IoU evaluation.
    pub evaluation_min_confidence: f32,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            score: thresholds::SCORE,
            nms: thresholds::NMS,
            mask: thresholds::MASK,
            live_min_confidence: thresholds::LIVE_MIN_CONFIDENCE,
            report_min_confidence: thresholds::REPORT_MIN_CONFIDENCE,
            evaluation_min_confidence: thresholds::EVALUATION_MIN_CONFIDENCE,
        }
    }
}

impl ThresholdsConfig {
    /// Thresholds handed to the detection engine.
    pub const fn detection(&self) -> DetectionThresholds {
        DetectionThresholds {
            score: self.score,
            nms: self.nms,
            mask: self.mask,
        }
    }
}

/// Inference device configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    /// Automatically select (GPU if available, else CPU).
    #[default]
    Auto,
    /// Prefer GPU, warn and use CPU if unavailable.
    Gpu,
    /// Force CPU inference.
    Cpu,
}

/// Inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Device to use for inference.
    pub device: InferenceDevice,
}

/// Service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory for generated imagery and reports.
    pub artifacts_dir: Option<PathBuf>,

    /// Batch items processed at once (1 = sequential).
    pub batch_concurrency: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: None,
            batch_concurrency: service::DEFAULT_BATCH_CONCURRENCY,
        }
    }
}
