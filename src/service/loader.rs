//! Weights resolution and model loading.

use crate::inference::{
    ComputeDevice, DetectionEngine, DetectionThresholds, OnnxSegmenter, WeightsKind,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Which model the service is running with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// Fine-tuned solar weights.
    FineTuned,
    /// Stock pretrained weights.
    Generic,
    /// No usable weights; detection requests are refused.
    NotLoaded,
}

impl From<WeightsKind> for ModelState {
    fn from(weights: WeightsKind) -> Self {
        match weights {
            WeightsKind::FineTuned => Self::FineTuned,
            WeightsKind::Generic => Self::Generic,
        }
    }
}

impl std::fmt::Display for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FineTuned => write!(f, "fine_tuned"),
            Self::Generic => write!(f, "generic"),
            Self::NotLoaded => write!(f, "not_loaded"),
        }
    }
}

/// Pick the weights file to load: fine-tuned if present, else the stock
/// pretrained file, else nothing.
pub fn resolve_weights(weights: &Path, base_weights: &Path) -> Option<(PathBuf, WeightsKind)> {
    if weights.is_file() {
        return Some((weights.to_path_buf(), WeightsKind::FineTuned));
    }
    if base_weights.is_file() {
        warn!(
            "Fine-tuned weights not found at {}; falling back to GENERIC pretrained weights from {}. \
             Solar panel detection accuracy will be severely degraded.",
            weights.display(),
            base_weights.display()
        );
        return Some((base_weights.to_path_buf(), WeightsKind::Generic));
    }
    warn!(
        "No model weights found (looked for {} and {}); detection is disabled",
        weights.display(),
        base_weights.display()
    );
    None
}

/// Load the detection engine, or `None` when no weights are usable.
///
/// A weights file that fails to load is logged and treated as missing so
/// the service still starts.
pub fn load_engine(
    weights: &Path,
    base_weights: &Path,
    thresholds: DetectionThresholds,
    device: ComputeDevice,
) -> Option<DetectionEngine> {
    let (path, kind) = resolve_weights(weights, base_weights)?;
    match OnnxSegmenter::load(&path, kind, device) {
        Ok(model) => Some(DetectionEngine::new(Box::new(model), thresholds, device)),
        Err(e) => {
            error!("Model load failed: {e}");
            None
        }
    }
}
