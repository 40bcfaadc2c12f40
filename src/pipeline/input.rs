//! Batch location input (JSON or CSV).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// One batch item as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchLocation {
    /// Caller-defined id, echoed back as `user_id`.
    pub id: String,
    /// Latitude; validated per item, not at parse time.
    pub lat: f64,
    /// Longitude; validated per item, not at parse time.
    pub lon: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonBatch {
    Wrapped { locations: Vec<BatchLocation> },
    Bare(Vec<BatchLocation>),
}

/// Read batch locations, choosing the parser by file extension
/// (`.json`, anything else is CSV).
pub fn read_batch_locations(path: &Path) -> Result<Vec<BatchLocation>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let contents = std::fs::read_to_string(path)?;

    if is_json {
        parse_json_locations(&contents).map_err(|message| Error::BatchInput {
            path: path.to_path_buf(),
            message,
        })
    } else {
        parse_csv_locations(contents.as_bytes()).map_err(|e| match e {
            CsvInputError::Csv(source) => Error::CsvParse {
                path: path.to_path_buf(),
                source,
            },
            CsvInputError::Layout(message) => Error::BatchInput {
                path: path.to_path_buf(),
                message,
            },
        })
    }
}

/// Parse `{"locations": [...]}` or a bare array.
pub fn parse_json_locations(contents: &str) -> std::result::Result<Vec<BatchLocation>, String> {
    match serde_json::from_str::<JsonBatch>(contents) {
        Ok(JsonBatch::Wrapped { locations } | JsonBatch::Bare(locations)) => Ok(locations),
        Err(e) => Err(format!(
            "expected {{\"locations\": [{{\"id\", \"lat\", \"lon\"}}]}} or an array of locations: {e}"
        )),
    }
}

/// CSV input failure.
#[derive(Debug)]
pub enum CsvInputError {
    /// Reader error.
    Csv(csv::Error),
    /// Missing columns.
    Layout(String),
}

/// Parse CSV with a header row.
///
/// Columns are found by header names containing `lat`, `lon` and `id`
/// (case-insensitive, first match wins). Without an id column, rows get
/// `loc_<n>` ids, where `n` is the row's line number after the header.
/// Blank lines are skipped but still count, so ids stay tied to file lines.
/// Rows whose numbers do not parse are skipped with a warning.
pub fn parse_csv_locations<R: std::io::Read>(
    reader: R,
) -> std::result::Result<Vec<BatchLocation>, CsvInputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(CsvInputError::Csv)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .collect();
    let find = |needle: &str| headers.iter().position(|h| h.contains(needle));

    let (Some(lat_idx), Some(lon_idx)) = (find("lat"), find("lon")) else {
        return Err(CsvInputError::Layout(
            "CSV must contain 'lat' and 'lon' columns".to_string(),
        ));
    };
    let id_idx = find("id");

    let mut locations = Vec::new();
    for record in reader.records() {
        let record = record.map_err(CsvInputError::Csv)?;
        // line 1 is the header, so data on line n is row n - 1
        let row_number = record
            .position()
            .map_or(0, |pos| pos.line().saturating_sub(1));
        if record.iter().all(str::is_empty) {
            continue;
        }

        let parse = |idx: usize| record.get(idx).and_then(|v| v.parse::<f64>().ok());
        let (Some(lat), Some(lon)) = (parse(lat_idx), parse(lon_idx)) else {
            warn!("Skipping CSV row {row_number}: unparsable lat/lon");
            continue;
        };

        let id = id_idx
            .and_then(|idx| record.get(idx))
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("loc_{row_number}"), str::to_string);

        locations.push(BatchLocation { id, lat, lon });
    }

    Ok(locations)
}
