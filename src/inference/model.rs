//! The instance-segmentation model seam.

use crate::error::Result;
use crate::imagery::Raster;
use serde::Serialize;

/// One candidate instance as produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInstance {
    /// Box as `[x1, y1, x2, y2]` in pixels.
    pub bbox: [f32; 4],
    /// Instance score in `[0, 1]`.
    pub score: f32,
    /// Soft mask, row-major, one probability per raster pixel.
    pub mask: Vec<f32>,
}

/// Raw per-instance output for one raster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPrediction {
    /// Width of every mask.
    pub width: u32,
    /// Height of every mask.
    pub height: u32,
    /// Candidate instances, in model order.
    pub instances: Vec<RawInstance>,
}

/// Which weights a model was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsKind {
    /// Weights fine-tuned for solar panels.
    FineTuned,
    /// Stock pretrained weights; accuracy is degraded.
    Generic,
}

impl std::fmt::Display for WeightsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FineTuned => write!(f, "fine_tuned"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// A pretrained instance-segmentation model.
///
/// Implementations must be callable from several threads; any internal
/// serialization (e.g. a single accelerator context) is their own concern.
pub trait SegmentationModel: Send + Sync {
    /// Switch the model to inference mode (no dropout, frozen batch norm).
    fn set_inference_mode(&mut self);

    /// True once [`set_inference_mode`](Self::set_inference_mode) has taken effect.
    fn is_inference_mode(&self) -> bool;

    /// Run the model on one raster.
    fn predict(&self, raster: &Raster) -> Result<RawPrediction>;

    /// Weights the model was built from.
    fn weights(&self) -> WeightsKind;
}
