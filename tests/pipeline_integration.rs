//! End-to-end pipeline tests with a scripted segmentation model.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use solarscan::constants::fallback::PANEL;
use solarscan::evaluation::run_evaluation;
use solarscan::geo::{ZoomLevel, meters_per_pixel};
use solarscan::imagery::{ImageryProvider, Raster, RasterSize, generate_fallback_raster};
use solarscan::inference::{
    ComputeDevice, DetectionEngine, DetectionThresholds, RawInstance, RawPrediction,
    SegmentationModel, WeightsKind,
};
use solarscan::pipeline::{
    BatchLocation, InferenceOrchestrator, ReportOptions, run_batch, run_report,
};
use solarscan::service::{ModelState, SolarService};
use std::sync::Arc;

/// Fires one instance covering every pixel of the panel colour.
struct PanelColourModel {
    inference_mode: bool,
}

impl SegmentationModel for PanelColourModel {
    fn set_inference_mode(&mut self) {
        self.inference_mode = true;
    }

    fn is_inference_mode(&self) -> bool {
        self.inference_mode
    }

    fn predict(&self, raster: &Raster) -> solarscan::Result<RawPrediction> {
        let (width, height) = (raster.width(), raster.height());
        let mut mask = Vec::with_capacity((width * height) as usize);
        let (mut x1, mut y1, mut x2, mut y2) = (u32::MAX, u32::MAX, 0, 0);
        for y in 0..height {
            for x in 0..width {
                let hit = raster.pixel(x, y) == Some(PANEL);
                mask.push(if hit { 0.95 } else { 0.05 });
                if hit {
                    x1 = x1.min(x);
                    y1 = y1.min(y);
                    x2 = x2.max(x);
                    y2 = y2.max(y);
                }
            }
        }

        let instances = if x1 == u32::MAX {
            Vec::new()
        } else {
            vec![RawInstance {
                bbox: [x1 as f32, y1 as f32, x2 as f32 + 1.0, y2 as f32 + 1.0],
                score: 0.87,
                mask,
            }]
        };
        Ok(RawPrediction {
            width,
            height,
            instances,
        })
    }

    fn weights(&self) -> WeightsKind {
        WeightsKind::FineTuned
    }
}

fn orchestrator() -> Arc<InferenceOrchestrator> {
    let engine = DetectionEngine::new(
        Box::new(PanelColourModel {
            inference_mode: false,
        }),
        DetectionThresholds::default(),
        ComputeDevice::Cpu,
    );
    Arc::new(InferenceOrchestrator::new(
        Arc::new(engine),
        Arc::new(ImageryProvider::offline()),
        RasterSize::default(),
        0.01,
    ))
}

fn panel_pixels() -> u64 {
    let raster = generate_fallback_raster(RasterSize::default());
    let mut count = 0;
    for y in 0..raster.height() {
        for x in 0..raster.width() {
            if raster.pixel(x, y) == Some(PANEL) {
                count += 1;
            }
        }
    }
    count
}

fn location(id: &str, lat: f64, lon: f64) -> BatchLocation {
    BatchLocation {
        id: id.to_string(),
        lat,
        lon,
    }
}

#[test]
fn test_query_without_credential_uses_fallback_and_detects_panel() {
    let result = orchestrator().infer(12.9716, 77.5946, Some(1200)).unwrap();

    assert!(result.is_fallback_image);
    assert!(result.solar_present);
    assert_eq!(result.confidence, 0.87);
    assert_eq!(result.zoom, ZoomLevel::new(20));
    assert_eq!(result.bbox_list.len(), 1);
    assert_eq!(result.bbox_list[0].truncated(), [221, 271, 421, 371]);

    let mpp = meters_per_pixel(12.9716, ZoomLevel::new(20));
    let expected = panel_pixels() as f64 * mpp * mpp;
    assert!((result.solar_area_m2 - expected).abs() < 1e-9);
    assert!(result.solar_area_m2 > 0.0);
}

#[test]
fn test_query_is_idempotent() {
    let orchestrator = orchestrator();
    let first = orchestrator.infer(12.9716, 77.5946, None).unwrap();
    let second = orchestrator.infer(12.9716, 77.5946, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_larger_buffer_uses_wider_zoom() {
    let result = orchestrator().infer(12.9716, 77.5946, Some(2400)).unwrap();
    assert_eq!(result.zoom, ZoomLevel::new(19));
    assert_eq!(result.buffer_sqft, 2400);
}

#[test]
fn test_batch_isolates_failures_and_keeps_order() {
    let locations = vec![
        location("a", 12.9716, 77.5946),
        location("bad", 999.0, 77.5946),
        location("c", 36.1699, -115.1398),
    ];
    let records = run_batch(&orchestrator(), &locations, 1, false).unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "bad", "c"]);
    assert!(!records[0].is_error());
    assert!(records[1].is_error());
    assert!(!records[1].solar_present());
    assert_eq!(records[1].solar_area_m2(), 0.0);
    assert!(!records[2].is_error());

    let json = serde_json::to_value(&records[1]).unwrap();
    assert_eq!(json["user_id"], "bad");
    assert!(json["error"].as_str().unwrap().contains("latitude"));
}

#[test]
fn test_concurrent_batch_matches_sequential() {
    let orchestrator = orchestrator();
    let locations: Vec<BatchLocation> = (0..6)
        .map(|i| location(&format!("loc_{i}"), 10.0 + f64::from(i), 20.0))
        .chain(std::iter::once(location("polar", 89.0, 0.0)))
        .collect();

    let sequential = run_batch(&orchestrator, &locations, 1, false).unwrap();
    let concurrent = run_batch(&orchestrator, &locations, 3, false).unwrap();
    assert_eq!(sequential, concurrent);
    assert!(concurrent[6].is_error());
}

#[test]
fn test_service_round_trip_with_loaded_model() {
    let dir = tempfile::tempdir().unwrap();
    let service = SolarService::from_parts(
        Some(orchestrator()),
        ComputeDevice::Cpu,
        dir.path().to_path_buf(),
        2,
    );
    assert_eq!(service.health().model, ModelState::FineTuned);

    let (result, path) = service.infer_and_save(12.9716, 77.5946, None).unwrap();
    assert!(result.solar_present);
    assert!(path.is_file());
    assert!(path.to_string_lossy().ends_with("_12.9716_77.5946_z20.png"));

    let err = service.infer(12.9716, 200.0, None).unwrap_err();
    assert_eq!(err.status, 400);

    let response = service
        .batch_infer(
            &[location("x", 12.9716, 77.5946), location("y", 0.0, 0.0)],
            false,
        )
        .unwrap();
    assert_eq!(response.results.len(), 2);
}

/// Fires one instance over the left half of every raster.
struct LeftHalfModel {
    score: f32,
}

impl SegmentationModel for LeftHalfModel {
    fn set_inference_mode(&mut self) {}

    fn is_inference_mode(&self) -> bool {
        true
    }

    fn predict(&self, raster: &Raster) -> solarscan::Result<RawPrediction> {
        let (width, height) = (raster.width(), raster.height());
        let mask = (0..height)
            .flat_map(|_| (0..width).map(move |x| if x < width / 2 { 0.9 } else { 0.0 }))
            .collect();
        Ok(RawPrediction {
            width,
            height,
            instances: vec![RawInstance {
                bbox: [0.0, 0.0, (width / 2) as f32, height as f32],
                score: self.score,
                mask,
            }],
        })
    }

    fn weights(&self) -> WeightsKind {
        WeightsKind::Generic
    }
}

fn left_half_engine(score: f32) -> DetectionEngine {
    DetectionEngine::new(
        Box::new(LeftHalfModel { score }),
        DetectionThresholds::default(),
        ComputeDevice::Cpu,
    )
}

fn report_options(fail_fast: bool) -> ReportOptions {
    ReportOptions {
        min_confidence: 0.4,
        fail_fast,
        show_progress: false,
    }
}

/// `a_0_10.png` decodes; `b.png` does not.
fn report_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    Raster::filled(RasterSize::new(8, 8), [10, 20, 30])
        .save(&dir.path().join("a_0_10.png"))
        .unwrap();
    std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();
    dir
}

#[test]
fn test_report_skips_unreadable_images() {
    let dir = report_dir();
    let summary = run_report(&left_half_engine(0.9), dir.path(), report_options(false)).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.records.len(), 1);
    let record = &summary.records[0];
    assert_eq!(record.sample_id, "a_0_10");
    assert_eq!((record.lat, record.lon), (0.0, 10.0));
    assert!(record.has_solar);
    assert_eq!(record.confidence, 0.9);

    let mpp = meters_per_pixel(0.0, ZoomLevel::new(20));
    assert!((record.pv_area_sqm_est - 32.0 * mpp * mpp).abs() < 0.01);
}

#[test]
fn test_report_fail_fast_aborts_on_unreadable_image() {
    let dir = report_dir();
    let result = run_report(&left_half_engine(0.9), dir.path(), report_options(true));
    assert!(result.is_err());
}

#[test]
fn test_report_without_images_is_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "no images here").unwrap();

    let err = run_report(&left_half_engine(0.9), dir.path(), report_options(false)).unwrap_err();
    assert!(matches!(err, solarscan::Error::NoImages { .. }));
}

/// One 4x4 image whose label holds two polygons: the left and right halves.
fn evaluation_dataset() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    let labels = dir.path().join("labels");
    std::fs::create_dir(&images).unwrap();
    std::fs::create_dir(&labels).unwrap();
    Raster::filled(RasterSize::new(4, 4), [0, 0, 0])
        .save(&images.join("roof.png"))
        .unwrap();
    std::fs::write(
        labels.join("roof.txt"),
        "0 0 0 0.5 0 0.5 1 0 1\n0 0.5 0 1 0 1 1 0.5 1\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_evaluation_ignores_top_detection_at_or_below_cutoff() {
    let dataset = evaluation_dataset();
    let summary = run_evaluation(&left_half_engine(0.4), dataset.path(), 0.5, false).unwrap();

    assert_eq!(summary.images, 1);
    assert_eq!(summary.scored, 0);
    assert_eq!(summary.mean_iou, 0.0);
    assert!(summary.per_image.is_empty());
}

#[test]
fn test_evaluation_scores_against_all_label_polygons() {
    let dataset = evaluation_dataset();
    let summary = run_evaluation(&left_half_engine(0.9), dataset.path(), 0.5, false).unwrap();

    assert_eq!(summary.scored, 1);
    assert_eq!(summary.per_image[0].sample_id, "roof");
    // the left-half mask covers one of two labelled halves
    assert_eq!(summary.mean_iou, 0.5);
}
