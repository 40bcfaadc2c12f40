//! Error types for solarscan.

/// Result type alias for solarscan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for solarscan.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Data directory could not be determined.
    #[error("could not determine data directory for this platform")]
    DataDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Latitude outside -90..=90.
    #[error("invalid latitude: {value} (must be -90.0 to 90.0)")]
    InvalidLatitude {
        /// Invalid latitude value.
        value: f64,
    },

    /// Longitude outside -180..=180.
    #[error("invalid longitude: {value} (must be -180.0 to 180.0)")]
    InvalidLongitude {
        /// Invalid longitude value.
        value: f64,
    },

    /// Latitude too close to a pole for the flat-Earth box math.
    #[error("latitude {value} is outside the supported band (|lat| <= {limit})")]
    LatitudeOutsideSafeBand {
        /// Offending latitude.
        value: f64,
        /// Largest supported absolute latitude.
        limit: f64,
    },

    /// Requested area is not a positive number of square feet.
    #[error("invalid area: {value} sqft (must be positive)")]
    InvalidArea {
        /// Offending area.
        value: u32,
    },

    /// Raster size string is not `WIDTHxHEIGHT`.
    #[error("invalid image size '{value}' (expected WIDTHxHEIGHT)")]
    InvalidImageSize {
        /// Offending size string.
        value: String,
    },

    /// Imagery transport failure.
    #[error("failed to fetch imagery from '{url}'")]
    ImageryFetch {
        /// Request URL with the key redacted.
        url: String,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Image bytes could not be decoded.
    #[error("failed to decode image: {reason}")]
    ImageDecode {
        /// Decoder message.
        reason: String,
    },

    /// Failed to read an image from disk.
    #[error("failed to read image '{path}'")]
    ImageRead {
        /// Path to the image.
        path: std::path::PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Failed to write an image to disk.
    #[error("failed to write image '{path}'")]
    ImageWrite {
        /// Path to the image.
        path: std::path::PathBuf,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// No detection model is available.
    #[error("model not loaded")]
    ModelNotLoaded,

    /// Failed to load model weights.
    #[error("failed to load model '{path}': {reason}")]
    ModelLoad {
        /// Path to the weights file.
        path: std::path::PathBuf,
        /// Description of the load failure.
        reason: String,
    },

    /// Model call failed.
    #[error("detection failed: {reason}")]
    Detection {
        /// Description of the failure.
        reason: String,
    },

    /// Batch input could not be parsed.
    #[error("invalid batch input '{path}': {message}")]
    BatchInput {
        /// Path to the input file.
        path: std::path::PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// Failed to parse CSV batch input.
    #[error("failed to parse CSV '{path}'")]
    CsvParse {
        /// Path to the CSV file.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write CSV output.
    #[error("failed to write CSV output '{path}'")]
    CsvWrite {
        /// Path to the CSV file.
        path: std::path::PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize JSON for stdout.
    #[error("failed to serialize JSON")]
    JsonSerialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// No input images found.
    #[error("no images found in '{path}'")]
    NoImages {
        /// Directory that was scanned.
        path: std::path::PathBuf,
    },

    /// Dataset layout is not `images/` + `labels/`.
    #[error("invalid dataset at '{path}': {message}")]
    InvalidDataset {
        /// Dataset root.
        path: std::path::PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A query failed; its structured error record was already emitted.
    #[error("request failed with status {status} ({code})")]
    RequestFailed {
        /// HTTP-analogous status code.
        status: u16,
        /// Stable error code.
        code: &'static str,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

/// Coarse error classes used for propagation policy and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detection requested before a model was loaded. Retryable.
    ModelNotLoaded,
    /// Invalid or degenerate coordinate input. Not retryable.
    Geometry,
    /// Imagery transport failure. Absorbed by the provider.
    ImageryFetch,
    /// Failure inside the wrapped model call.
    Detection,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable `snake_case` identifier for structured error records.
    pub const fn code(self) -> &'static str {
        match self {
            Self::ModelNotLoaded => "model_not_loaded",
            Self::Geometry => "geometry_error",
            Self::ImageryFetch => "imagery_fetch_error",
            Self::Detection => "detection_error",
            Self::Internal => "internal_error",
        }
    }

    /// HTTP-analogous status code.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::ModelNotLoaded => 503,
            Self::Geometry => 400,
            Self::ImageryFetch | Self::Detection | Self::Internal => 500,
        }
    }
}

impl Error {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotLoaded => ErrorKind::ModelNotLoaded,
            Self::InvalidLatitude { .. }
            | Self::InvalidLongitude { .. }
            | Self::LatitudeOutsideSafeBand { .. }
            | Self::InvalidArea { .. } => ErrorKind::Geometry,
            Self::ImageryFetch { .. } | Self::ImageDecode { .. } => ErrorKind::ImageryFetch,
            Self::Detection { .. } | Self::ModelLoad { .. } => ErrorKind::Detection,
            _ => ErrorKind::Internal,
        }
    }

    /// HTTP-analogous status code for this error.
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_errors_map_to_client_error() {
        let err = Error::LatitudeOutsideSafeBand {
            value: 89.0,
            limit: 85.0,
        };
        assert_eq!(err.kind(), ErrorKind::Geometry);
        assert_eq!(err.status_code(), 400);
        assert_eq!(Error::InvalidLatitude { value: 999.0 }.status_code(), 400);
    }

    #[test]
    fn test_model_not_loaded_is_service_unavailable() {
        assert_eq!(Error::ModelNotLoaded.status_code(), 503);
        assert_eq!(Error::ModelNotLoaded.kind().code(), "model_not_loaded");
    }

    #[test]
    fn test_detection_error_is_internal() {
        let err = Error::Detection {
            reason: "bad shape".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Detection);
        assert_eq!(err.status_code(), 500);
        assert_eq!(
            Error::Internal {
                message: "x".to_string()
            }
            .kind(),
            ErrorKind::Internal
        );
    }
}
