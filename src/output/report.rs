//! Offline batch report records (`predictions.json`).

use crate::constants::report;
use crate::error::{Error, Result};
use crate::inference::PixelBox;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Quality-control status of a report record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QcStatus {
    /// At least one detection passed the cutoff.
    Verifiable,
    /// Nothing passed the cutoff.
    NotVerifiable,
}

/// Imagery provenance recorded with every report record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    /// Imagery source.
    pub source: String,
    /// Capture date.
    pub capture_date: String,
}

impl Default for ImageMetadata {
    fn default() -> Self {
        Self {
            source: report::IMAGE_SOURCE.to_string(),
            capture_date: report::CAPTURE_DATE.to_string(),
        }
    }
}

/// One image in the offline report. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    /// Image file stem.
    pub sample_id: String,
    /// Latitude of the image.
    pub lat: f64,
    /// Longitude of the image.
    pub lon: f64,
    /// True when a detection passed the cutoff.
    pub has_solar: bool,
    /// Top passing score, two decimals.
    pub confidence: f64,
    /// Estimated panel area in square meters, two decimals.
    pub pv_area_sqm_est: f64,
    /// Buffer area the image represents.
    pub buffer_radius_sqft: u32,
    /// Quality-control status.
    pub qc_status: QcStatus,
    /// Boxes as `"[[x1,y1,x2,y2],...]"`.
    pub bbox_or_mask: String,
    /// Imagery provenance.
    pub image_metadata: ImageMetadata,
}

/// Round to the report's decimal places.
pub fn round_report_value(value: f64) -> f64 {
    let scale = 10_f64.powi(report::DECIMAL_PLACES);
    (value * scale).round() / scale
}

/// Render boxes as a bracketed list of integer lists, `"[]"` when empty.
pub fn format_bbox_list(boxes: &[PixelBox]) -> String {
    let inner = boxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("[{inner}]")
}

/// Write records as a JSON array with four-space indentation.
pub fn write_report(path: &Path, records: &[ReportRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_report_to(&mut writer, records).map_err(|e| Error::JsonWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer.flush()?;
    Ok(())
}

/// Serialize records to any writer.
pub fn write_report_to<W: Write>(
    writer: W,
    records: &[ReportRecord],
) -> std::result::Result<(), serde_json::Error> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(report::JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    records.serialize(&mut serializer)
}
