//! Mean-IoU evaluation of the detector over a labelled dataset.
//!
//! A dataset root holds `images/` and `labels/`; labels are YOLO polygon
//! text files paired with images by file stem.

mod labels;

pub use labels::{Polygon, parse_yolo_polygons, rasterize_polygons};

use crate::error::{Error, Result};
use crate::imagery::Raster;
use crate::inference::{BinaryMask, DetectionEngine};
use crate::output::progress;
use crate::pipeline::collect_images;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// IoU recorded for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageIou {
    /// Image file stem.
    pub sample_id: String,
    /// Score of the top detection.
    pub score: f32,
    /// IoU of the top mask against the ground truth.
    pub iou: f64,
}

/// Evaluation outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationSummary {
    /// Images in the dataset.
    pub images: usize,
    /// Images whose top detection passed the cutoff.
    pub scored: usize,
    /// Mean IoU over scored images, 0.0 when none.
    pub mean_iou: f64,
    /// Per-image IoU, in file-name order.
    pub per_image: Vec<ImageIou>,
}

impl EvaluationSummary {
    fn from_scores(images: usize, per_image: Vec<ImageIou>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let mean_iou = if per_image.is_empty() {
            0.0
        } else {
            per_image.iter().map(|s| s.iou).sum::<f64>() / per_image.len() as f64
        };
        Self {
            images,
            scored: per_image.len(),
            mean_iou,
            per_image,
        }
    }
}

/// Image and label paths of one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Image file.
    pub image: PathBuf,
    /// Matching label file, if any.
    pub label: Option<PathBuf>,
}

/// Pair every image with its `labels/<stem>.txt`.
pub fn dataset_samples(root: &Path) -> Result<Vec<Sample>> {
    let images_dir = root.join("images");
    let labels_dir = root.join("labels");
    for dir in [&images_dir, &labels_dir] {
        if !dir.is_dir() {
            return Err(Error::InvalidDataset {
                path: root.to_path_buf(),
                message: format!("missing directory {}", dir.display()),
            });
        }
    }

    let images = collect_images(&images_dir)?;
    if images.is_empty() {
        return Err(Error::NoImages { path: images_dir });
    }

    Ok(images
        .into_iter()
        .map(|image| {
            let label = image
                .file_stem()
                .map(|stem| labels_dir.join(format!("{}.txt", stem.to_string_lossy())))
                .filter(|path| path.is_file());
            if label.is_none() {
                debug!("No label for {}", image.display());
            }
            Sample { image, label }
        })
        .collect())
}

/// Ground-truth mask for a sample; empty when it has no label file.
pub fn ground_truth_mask(label: Option<&Path>, width: u32, height: u32) -> Result<BinaryMask> {
    let Some(path) = label else {
        return Ok(BinaryMask::empty(width, height));
    };
    let contents = std::fs::read_to_string(path)?;
    let polygons = parse_yolo_polygons(&contents, width, height);
    Ok(rasterize_polygons(&polygons, width, height))
}

fn evaluate_sample(
    engine: &DetectionEngine,
    sample: &Sample,
    min_confidence: f32,
) -> Result<Option<ImageIou>> {
    let raster = Raster::open(&sample.image)?;
    let detections = engine.detect(&raster)?;
    let Some(top) = detections.first().filter(|d| d.score > min_confidence) else {
        return Ok(None);
    };

    // scored against every labelled panel, not only the first polygon
    let truth = ground_truth_mask(sample.label.as_deref(), raster.width(), raster.height())?;
    Ok(Some(ImageIou {
        sample_id: sample
            .image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        score: top.score,
        iou: top.mask.iou(&truth),
    }))
}

/// Evaluate the engine over a dataset.
///
/// Only images whose top detection scores strictly above `min_confidence`
/// contribute; the top mask is compared with the union of all label
/// polygons. Unreadable images are logged and skipped.
pub fn run_evaluation(
    engine: &DetectionEngine,
    root: &Path,
    min_confidence: f32,
    show_progress: bool,
) -> Result<EvaluationSummary> {
    let samples = dataset_samples(root)?;
    info!("Evaluating {} images", samples.len());

    let pb = progress::create_progress(samples.len(), "images", show_progress);
    let mut per_image = Vec::new();
    for sample in &samples {
        match evaluate_sample(engine, sample, min_confidence) {
            Ok(Some(score)) => {
                debug!("{}: IoU {:.4}", score.sample_id, score.iou);
                per_image.push(score);
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}: {}", sample.image.display(), e),
        }
        progress::inc_progress(pb.as_ref());
    }
    progress::finish_progress(pb, "done");

    let summary = EvaluationSummary::from_scores(samples.len(), per_image);
    info!(
        "Mean IoU: {:.4} over {} of {} images",
        summary.mean_iou, summary.scored, summary.images
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_labels_dir_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        assert!(matches!(
            dataset_samples(dir.path()).unwrap_err(),
            Error::InvalidDataset { .. }
        ));
    }

    #[test]
    fn test_samples_pair_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        std::fs::create_dir(&images).unwrap();
        std::fs::create_dir(&labels).unwrap();
        std::fs::write(images.join("a.png"), b"").unwrap();
        std::fs::write(images.join("b.jpg"), b"").unwrap();
        std::fs::write(labels.join("a.txt"), "0 0 0 1 0 1 1").unwrap();

        let samples = dataset_samples(dir.path()).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, Some(labels.join("a.txt")));
        assert_eq!(samples[1].label, None);
    }

    #[test]
    fn test_ground_truth_without_label_is_empty() {
        let mask = ground_truth_mask(None, 4, 4).unwrap();
        assert_eq!(mask.pixel_count(), 0);
    }

    #[test]
    fn test_mean_iou() {
        let score = |iou| ImageIou {
            sample_id: "x".to_string(),
            score: 0.9,
            iou,
        };
        let summary = EvaluationSummary::from_scores(3, vec![score(0.5), score(1.0)]);
        assert_eq!(summary.scored, 2);
        assert_eq!(summary.mean_iou, 0.75);
        assert_eq!(EvaluationSummary::from_scores(3, vec![]).mean_iou, 0.0);
    }
}
