//! ONNX Runtime backend for an exported Mask R-CNN.
//!
//! Expects the torchvision export layout: a single `[3, H, W]` float input
//! and `boxes [N, 4]`, `scores [N]`, `masks [N, 1, H, W]` outputs.

use super::device::ComputeDevice;
use super::model::{RawInstance, RawPrediction, SegmentationModel, WeightsKind};
use crate::constants::model_io;
use crate::error::{Error, Result};
use crate::imagery::Raster;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Mask R-CNN session on ONNX Runtime.
pub struct OnnxSegmenter {
    session: Mutex<Session>,
    weights: WeightsKind,
}

impl std::fmt::Debug for OnnxSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSegmenter")
            .field("weights", &self.weights)
            .finish_non_exhaustive()
    }
}

impl OnnxSegmenter {
    /// Load a model file onto `device`.
    pub fn load(path: &Path, weights: WeightsKind, device: ComputeDevice) -> Result<Self> {
        info!("Loading {} weights from {}", weights, path.display());

        let builder = Session::builder().map_err(|e| load_error(path, &e))?;
        let builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, &e))?;
        let mut builder = match device {
            ComputeDevice::Cpu => builder,
            ComputeDevice::Cuda => with_cuda(builder, path)?,
        };
        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(path, &e))?;
        debug!("Model session ready on {}", device);

        Ok(Self {
            session: Mutex::new(session),
            weights,
        })
    }
}

#[cfg(feature = "cuda")]
fn with_cuda(
    builder: ort::session::builder::SessionBuilder,
    path: &Path,
) -> Result<ort::session::builder::SessionBuilder> {
    use ort::execution_providers::CUDAExecutionProvider;
    builder
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .map_err(|e| load_error(path, &e))
}

#[cfg(not(feature = "cuda"))]
fn with_cuda(
    builder: ort::session::builder::SessionBuilder,
    _path: &Path,
) -> Result<ort::session::builder::SessionBuilder> {
    Ok(builder)
}

fn load_error(path: &Path, e: &dyn std::fmt::Display) -> Error {
    Error::ModelLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn detection_error(e: &dyn std::fmt::Display) -> Error {
    Error::Detection {
        reason: e.to_string(),
    }
}

impl SegmentationModel for OnnxSegmenter {
    /// Exported graphs are frozen in inference mode.
    fn set_inference_mode(&mut self) {}

    fn is_inference_mode(&self) -> bool {
        true
    }

    fn predict(&self, raster: &Raster) -> Result<RawPrediction> {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        let input = Tensor::from_array((
            [3_usize, height, width],
            raster.to_chw_f32().into_boxed_slice(),
        ))
        .map_err(|e| detection_error(&e))?;

        let mut session = self.session.lock().map_err(|_| Error::Detection {
            reason: "model session lock poisoned".to_string(),
        })?;
        let outputs = session
            .run(ort::inputs![model_io::INPUT => input])
            .map_err(|e| detection_error(&e))?;

        let (_, boxes) = outputs[model_io::BOXES]
            .try_extract_tensor::<f32>()
            .map_err(|e| detection_error(&e))?;
        let (_, scores) = outputs[model_io::SCORES]
            .try_extract_tensor::<f32>()
            .map_err(|e| detection_error(&e))?;
        let (mask_shape, masks) = outputs[model_io::MASKS]
            .try_extract_tensor::<f32>()
            .map_err(|e| detection_error(&e))?;

        let dims: Vec<i64> = mask_shape.iter().copied().collect();
        split_instances(boxes, scores, masks, &dims, width, height)
    }

    fn weights(&self) -> WeightsKind {
        self.weights
    }
}

/// Split flat output tensors into per-instance records, checking shapes.
fn split_instances(
    boxes: &[f32],
    scores: &[f32],
    masks: &[f32],
    mask_dims: &[i64],
    width: usize,
    height: usize,
) -> Result<RawPrediction> {
    let count = scores.len();
    let plane = width * height;

    if boxes.len() != count * 4 {
        return Err(Error::Detection {
            reason: format!(
                "boxes tensor has {} values, expected {} for {count} instances",
                boxes.len(),
                count * 4
            ),
        });
    }
    let expected_dims = [count as i64, 1, height as i64, width as i64];
    if count > 0 && mask_dims != expected_dims.as_slice() {
        return Err(Error::Detection {
            reason: format!("masks tensor has shape {mask_dims:?}, expected {expected_dims:?}"),
        });
    }
    if masks.len() != count * plane {
        return Err(Error::Detection {
            reason: format!(
                "masks tensor has {} values, expected {}",
                masks.len(),
                count * plane
            ),
        });
    }

    let instances = (0..count)
        .map(|i| RawInstance {
            bbox: [boxes[i * 4], boxes[i * 4 + 1], boxes[i * 4 + 2], boxes[i * 4 + 3]],
            score: scores[i],
            mask: masks[i * plane..(i + 1) * plane].to_vec(),
        })
        .collect();

    #[allow(clippy::cast_possible_truncation)]
    Ok(RawPrediction {
        width: width as u32,
        height: height as u32,
        instances,
    })
}
