//! Batch result CSV export.

use crate::error::{Error, Result};
use crate::output::{BatchOutcome, BatchRecord};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One exported row. Error records export zeros for the missing fields.
#[derive(Debug, Serialize)]
struct BatchCsvRow<'a> {
    user_id: &'a str,
    solar_present: bool,
    solar_area_m2: f64,
    confidence: f32,
    latitude: f64,
    longitude: f64,
}

impl<'a> From<&'a BatchRecord> for BatchCsvRow<'a> {
    fn from(record: &'a BatchRecord) -> Self {
        match &record.outcome {
            BatchOutcome::Success(result) => Self {
                user_id: &record.user_id,
                solar_present: result.solar_present,
                solar_area_m2: result.solar_area_m2,
                confidence: result.confidence,
                latitude: result.latitude,
                longitude: result.longitude,
            },
            BatchOutcome::Failure(failure) => Self {
                user_id: &record.user_id,
                solar_present: failure.solar_present,
                solar_area_m2: failure.solar_area_m2,
                confidence: 0.0,
                latitude: 0.0,
                longitude: 0.0,
            },
        }
    }
}

/// Write batch records as CSV to `writer`.
pub fn write_batch_csv_to<W: Write>(writer: W, records: &[BatchRecord]) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(BatchCsvRow::from(record))?;
    }
    if records.is_empty() {
        csv_writer.write_record([
            "user_id",
            "solar_present",
            "solar_area_m2",
            "confidence",
            "latitude",
            "longitude",
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write batch records as CSV to `path`.
pub fn write_batch_csv(path: &Path, records: &[BatchRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_batch_csv_to(file, records).map_err(|e| Error::CsvWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
