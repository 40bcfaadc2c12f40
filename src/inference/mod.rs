//! Rooftop solar panel detection on a raster.

mod device;
mod engine;
mod model;
mod nms;
mod onnx;

pub use device::{ComputeDevice, cuda_runtime_present, library_search_paths, select_device};
pub use engine::{BinaryMask, Detection, DetectionEngine, DetectionThresholds, PixelBox};
pub use model::{RawInstance, RawPrediction, SegmentationModel, WeightsKind};
pub use nms::{box_iou, non_max_suppression};
pub use onnx::OnnxSegmenter;
