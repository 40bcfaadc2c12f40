//! Application-wide constants.
//!
//! All calibration constants (projection math, zoom breakpoints, detection
//! thresholds) live here so they can be reproduced and tested in isolation.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "solarscan";

/// Environment variable holding the imagery provider API key.
pub const API_KEY_ENV: &str = "SOLAR_API_KEY";

/// Web-Mercator projection and unit conversion constants.
pub mod geo {
    /// Equatorial circumference of the Earth in meters.
    pub const EARTH_CIRCUMFERENCE_M: f64 = 40_075_017.0;

    /// log2 of the tile edge in pixels (256 px tiles).
    pub const TILE_SIZE_EXPONENT: i32 = 8;

    /// Square meters per square foot.
    pub const SQFT_TO_SQM: f64 = 0.092_903;

    /// Flat-Earth approximation of meters per degree of latitude.
    pub const METERS_PER_DEGREE_LAT: f64 = 111_000.0;

    /// Largest absolute latitude accepted by the query geometry.
    ///
    /// Beyond this the longitude correction `1 / cos(lat)` diverges.
    pub const MAX_SAFE_LATITUDE: f64 = 85.0;

    /// Valid latitude range in degrees.
    pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

    /// Valid longitude range in degrees.
    pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;
}

/// Zoom level lookup table keyed on requested buffer area.
pub mod zoom {
    /// Largest area (inclusive) served at the close zoom level.
    pub const CLOSE_MAX_AREA_SQFT: u32 = 1500;

    /// Zoom level for small buffer areas.
    pub const CLOSE: u8 = 20;

    /// Zoom level for everything larger.
    pub const WIDE: u8 = 19;
}

/// Supported buffer areas.
pub mod buffer {
    /// Default (and smaller) buffer area in square feet.
    pub const SMALL_SQFT: u32 = 1200;

    /// Larger buffer area in square feet.
    pub const LARGE_SQFT: u32 = 2400;
}

/// Detection calibration thresholds.
pub mod thresholds {
    /// Per-instance score floor applied to raw model output.
    ///
    /// Far below typical production values so an undertrained model still
    /// surfaces detections.
    pub const SCORE: f32 = 0.01;

    /// IoU cutoff for non-maximum suppression.
    pub const NMS: f32 = 0.5;

    /// Soft mask probability above which a pixel belongs to the instance.
    pub const MASK: f32 = 0.5;

    /// Confidence cutoff for the live single-query and batch interfaces.
    pub const LIVE_MIN_CONFIDENCE: f32 = 0.01;

    /// Confidence cutoff for the offline report pipeline.
    pub const REPORT_MIN_CONFIDENCE: f32 = 0.40;

    /// Top-detection cutoff for IoU evaluation.
    pub const EVALUATION_MIN_CONFIDENCE: f32 = 0.5;

    /// Valid range for any threshold.
    pub const RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;
}

/// Imagery provider constants.
pub mod imagery {
    /// Default raster size requested from the provider.
    pub const DEFAULT_SIZE: &str = "640x640";

    /// Static map endpoint.
    pub const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";

    /// Map type requested from the static map endpoint.
    pub const MAP_TYPE: &str = "satellite";

    /// Default fetch timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// User-Agent sent with imagery requests.
    pub const USER_AGENT: &str = concat!("solarscan/", env!("CARGO_PKG_VERSION"));

    /// Coordinate used by `imagery check` (Las Vegas).
    pub const CHECK_LATITUDE: f64 = 36.1699;

    /// Longitude used by `imagery check`.
    pub const CHECK_LONGITUDE: f64 = -115.1398;

    /// Zoom used by `imagery check`.
    pub const CHECK_ZOOM: u8 = 20;
}

/// Fallback raster layout. Sizes are in pixels.
pub mod fallback {
    /// Grass background.
    pub const BACKGROUND: [u8; 3] = [34, 139, 34];
    /// Road band.
    pub const ROAD: [u8; 3] = [105, 105, 105];
    /// House roof.
    pub const HOUSE: [u8; 3] = [245, 245, 220];
    /// Solar panel.
    pub const PANEL: [u8; 3] = [25, 25, 112];
    /// Panel grid lines.
    pub const GRID: [u8; 3] = [200, 200, 200];
    /// Warning text (first two lines).
    pub const WARNING_TEXT: [u8; 3] = [255, 0, 0];
    /// Informational text (third line).
    pub const INFO_TEXT: [u8; 3] = [255, 255, 255];

    /// Half the width of the vertical road band.
    pub const ROAD_HALF_WIDTH: i64 = 40;
    /// Half the house width.
    pub const HOUSE_HALF_WIDTH: i64 = 150;
    /// Half the house height.
    pub const HOUSE_HALF_HEIGHT: i64 = 100;
    /// Panel inset from every house edge.
    pub const PANEL_INSET: i64 = 50;
    /// Spacing of vertical grid lines.
    pub const GRID_COLUMN_STEP: usize = 20;
    /// Spacing of horizontal grid lines.
    pub const GRID_ROW_STEP: usize = 40;

    /// Warning lines drawn in the top-left corner: (x, y, text, colour).
    pub const WARNING_LINES: [(i64, i64, &str, [u8; 3]); 3] = [
        (10, 10, "DEMO MODE: INVALID API KEY", WARNING_TEXT),
        (10, 25, "Please set SOLAR_API_KEY for live imagery", WARNING_TEXT),
        (10, 40, "Using Mock Image for Demonstration", INFO_TEXT),
    ];
}

/// ONNX model tensor names (torchvision Mask R-CNN export).
pub mod model_io {
    /// Input image tensor, `[3, H, W]` float in `[0, 1]`.
    pub const INPUT: &str = "image";
    /// Boxes output, `[N, 4]` as `x1, y1, x2, y2`.
    pub const BOXES: &str = "boxes";
    /// Scores output, `[N]`.
    pub const SCORES: &str = "scores";
    /// Soft masks output, `[N, 1, H, W]`.
    pub const MASKS: &str = "masks";

    /// Default fine-tuned weights file name.
    pub const WEIGHTS_FILE: &str = "solar_maskrcnn.onnx";
    /// Default stock pretrained weights file name.
    pub const BASE_WEIGHTS_FILE: &str = "maskrcnn_coco.onnx";
}

/// Offline report constants.
pub mod report {
    /// Area per pixel used when an image carries no coordinate (~0.3 m GSD).
    pub const FLAT_SQM_PER_PIXEL: f64 = 0.09;
    /// Latitude recorded when the file name carries no coordinate.
    pub const DEFAULT_LATITUDE: f64 = 12.9716;
    /// Longitude recorded when the file name carries no coordinate.
    pub const DEFAULT_LONGITUDE: f64 = 77.5946;
    /// Image source recorded in `image_metadata`.
    pub const IMAGE_SOURCE: &str = "Satellite";
    /// Capture date recorded in `image_metadata`.
    pub const CAPTURE_DATE: &str = "2024-01-01";
    /// Default output file name.
    pub const DEFAULT_OUTPUT_FILE: &str = "predictions.json";
    /// JSON indentation.
    pub const JSON_INDENT: &[u8] = b"    ";
    /// Image extensions picked up from the input directory.
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
    /// Decimal places for confidence and area.
    pub const DECIMAL_PLACES: i32 = 2;
}

/// Service defaults.
pub mod service {
    /// Default batch concurrency (sequential).
    pub const DEFAULT_BATCH_CONCURRENCY: usize = 1;
    /// Artifacts directory name under the data dir.
    pub const ARTIFACTS_DIR: &str = "artifacts";
    /// Models directory name under the data dir.
    pub const MODELS_DIR: &str = "models";
    /// Liveness status string.
    pub const STATUS_OK: &str = "ok";
}
