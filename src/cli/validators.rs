//! Value parsers for CLI arguments.

use crate::constants::{geo, thresholds};
use crate::imagery::RasterSize;
use std::ops::RangeInclusive;

fn parse_in_range(s: &str, range: &RangeInclusive<f64>, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !range.contains(&value) {
        return Err(format!(
            "{name} must be between {:.1} and {:.1}, got {value}",
            range.start(),
            range.end()
        ));
    }

    Ok(value)
}

/// Latitude in degrees.
pub fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_in_range(s, &geo::LATITUDE_RANGE, "latitude")
}

/// Longitude in degrees.
pub fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_in_range(s, &geo::LONGITUDE_RANGE, "longitude")
}

/// Confidence cutoff in `[0, 1]`.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    let range = f64::from(*thresholds::RANGE.start())..=f64::from(*thresholds::RANGE.end());
    parse_in_range(s, &range, "confidence").map(|v| v as f32)
}

/// Raster size as `WIDTHxHEIGHT`.
pub fn parse_raster_size(s: &str) -> Result<RasterSize, String> {
    s.parse::<RasterSize>().map_err(|e| e.to_string())
}
