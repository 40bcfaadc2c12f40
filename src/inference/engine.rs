//! Calling contract around the segmentation model.

use super::device::ComputeDevice;
use super::model::{RawInstance, SegmentationModel, WeightsKind};
use super::nms::non_max_suppression;
use crate::constants::thresholds;
use crate::error::{Error, Result};
use crate::imagery::Raster;
use serde::{Serialize, Serializer};
use tracing::debug;

/// Score, NMS and mask thresholds applied to raw model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionThresholds {
    /// Instances must score strictly above this.
    pub score: f32,
    /// IoU above which the lower-scoring box is suppressed.
    pub nms: f32,
    /// Soft-mask probability above which a pixel is foreground.
    pub mask: f32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            score: thresholds::SCORE,
            nms: thresholds::NMS,
            mask: thresholds::MASK,
        }
    }
}

/// Pixel rectangle `[x1, y1, x2, y2]`.
///
/// Serializes as a four-element integer array, truncating toward zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    /// Left.
    pub x1: f32,
    /// Top.
    pub y1: f32,
    /// Right.
    pub x2: f32,
    /// Bottom.
    pub y2: f32,
}

impl PixelBox {
    /// Corners truncated toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn truncated(&self) -> [i64; 4] {
        [
            self.x1 as i64,
            self.y1 as i64,
            self.x2 as i64,
            self.y2 as i64,
        ]
    }

    /// Corners as an array.
    pub const fn as_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for PixelBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl Serialize for PixelBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.truncated().serialize(serializer)
    }
}

impl std::fmt::Display for PixelBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x1, y1, x2, y2] = self.truncated();
        write!(f, "[{x1},{y1},{x2},{y2}]")
    }
}

/// Binary per-pixel mask, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// Build a mask from explicit bits. `bits.len()` must be `width * height`.
    pub fn from_bits(width: u32, height: u32, bits: Vec<bool>) -> Result<Self> {
        if bits.len() != width as usize * height as usize {
            return Err(Error::Detection {
                reason: format!(
                    "mask has {} pixels, expected {}x{}",
                    bits.len(),
                    width,
                    height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Binarize a soft mask at `threshold` (strictly greater is foreground).
    pub fn from_soft(width: u32, height: u32, soft: &[f32], threshold: f32) -> Result<Self> {
        Self::from_bits(width, height, soft.iter().map(|&p| p > threshold).collect())
    }

    /// All-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Mask width.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Foreground pixel count.
    pub fn pixel_count(&self) -> u64 {
        self.bits.iter().filter(|&&b| b).count() as u64
    }

    /// Whether `(x, y)` is foreground; `false` outside the mask.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize]
    }

    /// Set `(x, y)`; ignored outside the mask.
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.bits[y as usize * self.width as usize + x as usize] = value;
        }
    }

    /// Pixel-wise OR with a mask of the same size.
    pub fn union_with(&mut self, other: &Self) {
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= *b;
        }
    }

    /// Intersection over union with another mask. `0.0` when both are empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn iou(&self, other: &Self) -> f64 {
        let (inter, union) = self
            .bits
            .iter()
            .zip(&other.bits)
            .fold((0_u64, 0_u64), |(i, u), (&a, &b)| {
                (i + u64::from(a && b), u + u64::from(a || b))
            });
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }
}

/// One surviving instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Binary footprint, same size as the raster.
    pub mask: BinaryMask,
    /// Bounding box in pixels.
    pub bbox: PixelBox,
    /// Score in `[0, 1]`.
    pub score: f32,
}

/// Runs a [`SegmentationModel`] and applies the detection thresholds.
pub struct DetectionEngine {
    model: Box<dyn SegmentationModel>,
    thresholds: DetectionThresholds,
    device: ComputeDevice,
}

impl std::fmt::Debug for DetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEngine")
            .field("weights", &self.model.weights())
            .field("thresholds", &self.thresholds)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl DetectionEngine {
    /// Wrap a model, switching it to inference mode.
    pub fn new(
        mut model: Box<dyn SegmentationModel>,
        thresholds: DetectionThresholds,
        device: ComputeDevice,
    ) -> Self {
        model.set_inference_mode();
        Self {
            model,
            thresholds,
            device,
        }
    }

    /// Device the model was placed on.
    pub const fn device(&self) -> ComputeDevice {
        self.device
    }

    /// Weights the model was loaded from.
    pub fn weights(&self) -> WeightsKind {
        self.model.weights()
    }

    /// Thresholds in effect.
    pub const fn thresholds(&self) -> DetectionThresholds {
        self.thresholds
    }

    /// Detect instances in `raster`, highest score first.
    pub fn detect(&self, raster: &Raster) -> Result<Vec<Detection>> {
        if !self.model.is_inference_mode() {
            return Err(Error::Detection {
                reason: "model is not in inference mode".to_string(),
            });
        }

        let prediction = self.model.predict(raster)?;
        if (prediction.width, prediction.height) != (raster.width(), raster.height()) {
            return Err(Error::Detection {
                reason: format!(
                    "model returned {}x{} masks for a {} raster",
                    prediction.width,
                    prediction.height,
                    raster.size()
                ),
            });
        }

        let candidates: Vec<&RawInstance> = prediction
            .instances
            .iter()
            .filter(|i| i.score.is_finite() && i.score > self.thresholds.score)
            .collect();
        let boxes: Vec<[f32; 4]> = candidates.iter().map(|i| i.bbox).collect();
        let scores: Vec<f32> = candidates.iter().map(|i| i.score).collect();
        let keep = non_max_suppression(&boxes, &scores, self.thresholds.nms);

        debug!(
            "{} raw instances, {} above score {}, {} after NMS",
            prediction.instances.len(),
            candidates.len(),
            self.thresholds.score,
            keep.len()
        );

        keep.into_iter()
            .map(|idx| {
                let instance = candidates[idx];
                Ok(Detection {
                    mask: BinaryMask::from_soft(
                        prediction.width,
                        prediction.height,
                        &instance.mask,
                        self.thresholds.mask,
                    )?,
                    bbox: PixelBox::from(instance.bbox),
                    score: instance.score,
                })
            })
            .collect()
    }
}
