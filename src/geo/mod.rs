//! Ground geometry for a query window.
//!
//! Converts a `(lat, area)` request into a bounding box and an imagery zoom
//! level, and converts detected pixel footprints back into square meters.
//! Everything here is a first-order flat-Earth / Web-Mercator approximation.

use crate::constants::{geo, zoom};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A validated geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude, -90..=90.
    pub lat: f64,
    /// Longitude, -180..=180.
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting out-of-range or non-finite values.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !geo::LATITUDE_RANGE.contains(&lat) {
            return Err(Error::InvalidLatitude { value: lat });
        }
        if !geo::LONGITUDE_RANGE.contains(&lon) {
            return Err(Error::InvalidLongitude { value: lon });
        }
        Ok(Self { lat, lon })
    }

    /// Reject latitudes where the longitude correction diverges.
    pub fn ensure_in_safe_band(self) -> Result<Self> {
        ensure_safe_latitude(self.lat)?;
        Ok(self)
    }
}

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Midpoint as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            f64::midpoint(self.min_lon, self.max_lon),
            f64::midpoint(self.min_lat, self.max_lat),
        )
    }
}

/// Tile-pyramid zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    /// Wrap a raw zoom value.
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Raw zoom value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported query window sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AreaRequest {
    /// 1200 sqft.
    #[default]
    Small,
    /// 2400 sqft.
    Large,
}

impl AreaRequest {
    /// Map a square-foot value onto a supported window, if it is one.
    pub const fn from_sqft(sqft: u32) -> Option<Self> {
        match sqft {
            crate::constants::buffer::SMALL_SQFT => Some(Self::Small),
            crate::constants::buffer::LARGE_SQFT => Some(Self::Large),
            _ => None,
        }
    }

    /// Map a square-foot value onto a supported window, defaulting to
    /// [`AreaRequest::Small`] for anything unsupported.
    pub fn from_sqft_or_default(sqft: Option<u32>) -> Self {
        match sqft {
            None => Self::default(),
            Some(value) => Self::from_sqft(value).unwrap_or_else(|| {
                tracing::warn!(
                    "Unsupported buffer_sqft {}, using {}",
                    value,
                    Self::default().sqft()
                );
                Self::default()
            }),
        }
    }

    /// Area in square feet.
    pub const fn sqft(self) -> u32 {
        match self {
            Self::Small => crate::constants::buffer::SMALL_SQFT,
            Self::Large => crate::constants::buffer::LARGE_SQFT,
        }
    }
}

/// Ground resolution in meters per pixel at `lat` and `zoom`.
pub fn meters_per_pixel(lat: f64, zoom: ZoomLevel) -> f64 {
    let pixels_around_equator = 2.0_f64.powi(i32::from(zoom.value()) + geo::TILE_SIZE_EXPONENT);
    geo::EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / pixels_around_equator
}

/// Bounding box of a square of `area_sqft` centered on `(lat, lon)`.
pub fn bounding_box_for_area(lat: f64, lon: f64, area_sqft: u32) -> Result<BoundingBox> {
    Coordinate::new(lat, lon)?.ensure_in_safe_band()?;
    if area_sqft == 0 {
        return Err(Error::InvalidArea { value: area_sqft });
    }

    let side_m = (f64::from(area_sqft) * geo::SQFT_TO_SQM).sqrt();
    let half_side_m = side_m / 2.0;

    let delta_lat = half_side_m / geo::METERS_PER_DEGREE_LAT;
    let delta_lon = half_side_m / (geo::METERS_PER_DEGREE_LAT * lat.to_radians().cos());

    Ok(BoundingBox {
        min_lon: lon - delta_lon,
        min_lat: lat - delta_lat,
        max_lon: lon + delta_lon,
        max_lat: lat + delta_lat,
    })
}

/// Zoom level used to image a window of `area_sqft`.
pub const fn zoom_level_for_area(area_sqft: u32) -> ZoomLevel {
    if area_sqft <= zoom::CLOSE_MAX_AREA_SQFT {
        ZoomLevel(zoom::CLOSE)
    } else {
        ZoomLevel(zoom::WIDE)
    }
}

/// Real-world area covered by `pixel_count` pixels of a raster imaged at
/// `(lat, zoom)`.
///
/// The pair must be the one that produced the raster being measured.
#[allow(clippy::cast_precision_loss)]
pub fn pixel_area_to_square_meters(pixel_count: u64, lat: f64, zoom: ZoomLevel) -> f64 {
    let mpp = meters_per_pixel(lat, zoom);
    pixel_count as f64 * mpp * mpp
}

fn ensure_safe_latitude(lat: f64) -> Result<()> {
    if lat.abs() > geo::MAX_SAFE_LATITUDE {
        return Err(Error::LatitudeOutsideSafeBand {
            value: lat,
            limit: geo::MAX_SAFE_LATITUDE,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_meters_per_pixel_equator_zoom_20() {
        let mpp = meters_per_pixel(0.0, ZoomLevel::new(20));
        // 40_075_017 / 2^28
        assert!((mpp - 0.149_291_07).abs() < 1e-6);
    }

    #[test]
    fn test_meters_per_pixel_decreases_with_zoom() {
        for lat in [-80.0, -45.0, 0.0, 12.9716, 60.0, 84.9] {
            let mut previous = f64::INFINITY;
            for level in 0..=22 {
                let mpp = meters_per_pixel(lat, ZoomLevel::new(level));
                assert!(mpp < previous, "lat {lat}, zoom {level}");
                previous = mpp;
            }
        }
    }

    #[test]
    fn test_meters_per_pixel_decreases_with_abs_latitude() {
        let zoom = ZoomLevel::new(20);
        let mut previous = meters_per_pixel(0.0, zoom);
        for step in 1..85 {
            let lat = f64::from(step);
            let north = meters_per_pixel(lat, zoom);
            let south = meters_per_pixel(-lat, zoom);
            assert!(north < previous);
            assert!((north - south).abs() < TOLERANCE);
            previous = north;
        }
    }

    #[test]
    fn test_bounding_box_is_centered_and_ordered() {
        for (lat, lon) in [(12.9716, 77.5946), (-33.86, 151.2), (84.0, -179.0), (0.0, 0.0)] {
            for area in [1200, 2400] {
                let bbox = bounding_box_for_area(lat, lon, area).unwrap();
                assert!(bbox.max_lon > bbox.min_lon);
                assert!(bbox.max_lat > bbox.min_lat);
                let (center_lon, center_lat) = bbox.center();
                assert!((center_lon - lon).abs() < TOLERANCE);
                assert!((center_lat - lat).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_bounding_box_side_length() {
        // 1200 sqft ~= 111.48 m^2, side ~= 10.56 m
        let bbox = bounding_box_for_area(0.0, 0.0, 1200).unwrap();
        let side_m = (bbox.max_lat - bbox.min_lat) * geo::METERS_PER_DEGREE_LAT;
        assert!((side_m - (1200.0 * geo::SQFT_TO_SQM).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_widens_longitude_away_from_equator() {
        let equator = bounding_box_for_area(0.0, 10.0, 1200).unwrap();
        let north = bounding_box_for_area(60.0, 10.0, 1200).unwrap();
        let equator_width = equator.max_lon - equator.min_lon;
        let north_width = north.max_lon - north.min_lon;
        assert!((north_width / equator_width - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_rejects_polar_latitude() {
        let result = bounding_box_for_area(89.9, 0.0, 1200);
        assert!(matches!(
            result.unwrap_err(),
            Error::LatitudeOutsideSafeBand { .. }
        ));
        assert!(bounding_box_for_area(-85.0, 0.0, 1200).is_ok());
        assert!(bounding_box_for_area(-85.001, 0.0, 1200).is_err());
    }

    #[test]
    fn test_bounding_box_rejects_out_of_range_input() {
        assert!(matches!(
            bounding_box_for_area(999.0, 0.0, 1200).unwrap_err(),
            Error::InvalidLatitude { .. }
        ));
        assert!(matches!(
            bounding_box_for_area(0.0, 181.0, 1200).unwrap_err(),
            Error::InvalidLongitude { .. }
        ));
        assert!(matches!(
            bounding_box_for_area(f64::NAN, 0.0, 1200).unwrap_err(),
            Error::InvalidLatitude { .. }
        ));
        assert!(matches!(
            bounding_box_for_area(0.0, 0.0, 0).unwrap_err(),
            Error::InvalidArea { .. }
        ));
    }

    #[test]
    fn test_zoom_level_breakpoint() {
        assert_eq!(zoom_level_for_area(1200).value(), 20);
        assert_eq!(zoom_level_for_area(1500).value(), 20);
        assert_eq!(zoom_level_for_area(1501).value(), 19);
        assert_eq!(zoom_level_for_area(2400).value(), 19);
    }

    #[test]
    fn test_pixel_area_zero_and_monotonic() {
        let zoom = ZoomLevel::new(20);
        assert_eq!(pixel_area_to_square_meters(0, 12.9716, zoom), 0.0);
        let mut previous = 0.0;
        for count in [1_u64, 10, 100, 10_000, 409_600] {
            let area = pixel_area_to_square_meters(count, 12.9716, zoom);
            assert!(area > previous);
            previous = area;
        }
    }

    #[test]
    fn test_pixel_area_uses_squared_resolution() {
        let zoom = ZoomLevel::new(19);
        let mpp = meters_per_pixel(40.0, zoom);
        let area = pixel_area_to_square_meters(1000, 40.0, zoom);
        assert!((area - 1000.0 * mpp * mpp).abs() < TOLERANCE);
    }

    #[test]
    fn test_area_request_defaults_unsupported_values() {
        assert_eq!(AreaRequest::from_sqft_or_default(None), AreaRequest::Small);
        assert_eq!(
            AreaRequest::from_sqft_or_default(Some(2400)),
            AreaRequest::Large
        );
        assert_eq!(
            AreaRequest::from_sqft_or_default(Some(5000)),
            AreaRequest::Small
        );
        assert_eq!(AreaRequest::from_sqft(1300), None);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(86.0, 0.0).unwrap().ensure_in_safe_band().is_err());
    }
}
