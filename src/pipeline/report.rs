//! Offline batch report over a directory of images.

use crate::constants::{buffer, report};
use crate::error::{Error, Result};
use crate::geo::{Coordinate, pixel_area_to_square_meters, zoom_level_for_area};
use crate::imagery::Raster;
use crate::inference::{Detection, DetectionEngine, PixelBox};
use crate::output::{
    ImageMetadata, QcStatus, ReportRecord, format_bbox_list, progress, round_report_value,
};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Options for a report run.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// Detections must score strictly above this.
    pub min_confidence: f32,
    /// Abort on the first image that fails.
    pub fail_fast: bool,
    /// Show a progress bar.
    pub show_progress: bool,
}

/// Outcome of a report run.
#[derive(Debug, Clone, Default)]
pub struct ReportSummary {
    /// One record per successfully processed image, in file-name order.
    pub records: Vec<ReportRecord>,
    /// Images that failed and were left out.
    pub failed: usize,
}

/// Image files directly inside `dir`, sorted by name.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path.is_file()
            && path.extension().is_some_and(|ext| {
                report::IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Coordinate encoded as a trailing `_<lat>_<lon>` in a file stem.
pub fn parse_stem_coordinate(stem: &str) -> Option<Coordinate> {
    let mut parts = stem.rsplitn(3, '_');
    let lon: f64 = parts.next()?.parse().ok()?;
    let lat: f64 = parts.next()?.parse().ok()?;
    Coordinate::new(lat, lon).ok()?.ensure_in_safe_band().ok()
}

/// Build the report record for one image.
///
/// With a coordinate the area is geographically calibrated at the default
/// buffer's zoom; without one it uses the flat per-pixel approximation and
/// the default coordinate.
pub fn build_report_record(
    sample_id: &str,
    coordinate: Option<Coordinate>,
    detections: &[Detection],
    min_confidence: f32,
) -> ReportRecord {
    let passing: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.score > min_confidence)
        .collect();
    let has_solar = !passing.is_empty();
    let pixel_count: u64 = passing.iter().map(|d| d.mask.pixel_count()).sum();

    #[allow(clippy::cast_precision_loss)]
    let area = match coordinate {
        _ if !has_solar => 0.0,
        Some(c) => {
            pixel_area_to_square_meters(pixel_count, c.lat, zoom_level_for_area(buffer::SMALL_SQFT))
        }
        None => pixel_count as f64 * report::FLAT_SQM_PER_PIXEL,
    };

    let boxes: Vec<PixelBox> = passing.iter().map(|d| d.bbox).collect();
    let (lat, lon) = coordinate.map_or(
        (report::DEFAULT_LATITUDE, report::DEFAULT_LONGITUDE),
        |c| (c.lat, c.lon),
    );

    ReportRecord {
        sample_id: sample_id.to_string(),
        lat,
        lon,
        has_solar,
        confidence: round_report_value(passing.first().map_or(0.0, |d| f64::from(d.score))),
        pv_area_sqm_est: round_report_value(area),
        buffer_radius_sqft: buffer::SMALL_SQFT,
        qc_status: if has_solar {
            QcStatus::Verifiable
        } else {
            QcStatus::NotVerifiable
        },
        bbox_or_mask: format_bbox_list(&boxes),
        image_metadata: ImageMetadata::default(),
    }
}

fn process_image(
    engine: &DetectionEngine,
    path: &Path,
    min_confidence: f32,
) -> Result<ReportRecord> {
    let sample_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let raster = Raster::open(path)?;
    let detections = engine.detect(&raster)?;
    if let Some(top) = detections.first() {
        debug!("Max score for {}: {:.4}", sample_id, top.score);
    }
    let coordinate = parse_stem_coordinate(&sample_id);
    Ok(build_report_record(
        &sample_id,
        coordinate,
        &detections,
        min_confidence,
    ))
}

/// Run detection over every image in `dir`.
pub fn run_report(
    engine: &DetectionEngine,
    dir: &Path,
    options: ReportOptions,
) -> Result<ReportSummary> {
    let images = collect_images(dir)?;
    if images.is_empty() {
        return Err(Error::NoImages {
            path: dir.to_path_buf(),
        });
    }
    info!("Found {} images to process", images.len());

    let pb = progress::create_progress(images.len(), "images", options.show_progress);
    let mut summary = ReportSummary::default();

    for path in &images {
        match process_image(engine, path, options.min_confidence) {
            Ok(record) => summary.records.push(record),
            Err(e) if options.fail_fast => {
                progress::finish_progress(pb, "aborted");
                return Err(e);
            }
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                summary.failed += 1;
            }
        }
        progress::inc_progress(pb.as_ref());
    }

    progress::finish_progress(pb, "done");
    info!(
        "Processed {} images ({} failed)",
        summary.records.len(),
        summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::geo::{ZoomLevel, meters_per_pixel};
    use crate::inference::BinaryMask;

    fn detection(score: f32, pixels: u32) -> Detection {
        let mut mask = BinaryMask::empty(20, 20);
        for i in 0..pixels {
            mask.set(i % 20, i / 20, true);
        }
        Detection {
            mask,
            bbox: PixelBox::from([1.7, 2.2, 15.9, 18.0]),
            score,
        }
    }

    #[test]
    fn test_parse_stem_coordinate() {
        let c = parse_stem_coordinate("roof_36.1699_-115.1398").unwrap();
        assert_eq!((c.lat, c.lon), (36.1699, -115.1398));
        assert!(parse_stem_coordinate("12.5_77.25").is_some());
        assert!(parse_stem_coordinate("roof_01").is_none());
        assert!(parse_stem_coordinate("roof_a_b").is_none());
        assert!(parse_stem_coordinate("roof_999_0").is_none());
    }

    #[test]
    fn test_record_without_coordinate_uses_flat_area() {
        let record = build_report_record("img", None, &[detection(0.876, 100)], 0.4);
        assert!(record.has_solar);
        assert_eq!(record.confidence, 0.88);
        assert_eq!(record.pv_area_sqm_est, 9.0);
        assert_eq!(record.lat, 12.9716);
        assert_eq!(record.lon, 77.5946);
        assert_eq!(record.qc_status, QcStatus::Verifiable);
        assert_eq!(record.bbox_or_mask, "[[1,2,15,18]]");
        assert_eq!(record.buffer_radius_sqft, 1200);
    }

    #[test]
    fn test_record_with_coordinate_is_calibrated() {
        let coordinate = Coordinate::new(0.0, 10.0).unwrap();
        let record = build_report_record("img_0_10", Some(coordinate), &[detection(0.9, 400)], 0.4);
        let mpp = meters_per_pixel(0.0, ZoomLevel::new(20));
        assert_eq!(record.pv_area_sqm_est, round_report_value(400.0 * mpp * mpp));
        assert_eq!(record.lon, 10.0);
    }

    #[test]
    fn test_record_below_cutoff() {
        let record = build_report_record("img", None, &[detection(0.39, 100)], 0.4);
        assert!(!record.has_solar);
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.pv_area_sqm_est, 0.0);
        assert_eq!(record.qc_status, QcStatus::NotVerifiable);
        assert_eq!(record.bbox_or_mask, "[]");
    }

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", "d.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.png")).unwrap();

        let names: Vec<String> = collect_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "d.jpeg"]);
    }
}
