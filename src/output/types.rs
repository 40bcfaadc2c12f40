//! Externally visible result records.

use crate::error::Error;
use crate::geo::{BoundingBox, ZoomLevel};
use crate::inference::PixelBox;
use serde::Serialize;

/// Result of one coordinate query. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    /// True when at least one detection passed the confidence cutoff.
    pub solar_present: bool,
    /// Summed footprint of every passing detection, in square meters.
    pub solar_area_m2: f64,
    /// Score of the highest-scoring passing detection, `0.0` if none.
    pub confidence: f32,
    /// Box of every passing detection, highest score first.
    pub bbox_list: Vec<PixelBox>,
    /// True when the synthetic fallback raster was analysed.
    pub is_fallback_image: bool,
    /// Query latitude.
    pub latitude: f64,
    /// Query longitude.
    pub longitude: f64,
    /// Zoom level the raster was requested at.
    pub zoom: ZoomLevel,
    /// Buffer area used for the query window.
    pub buffer_sqft: u32,
    /// Ground window of the query.
    pub query_bounds: BoundingBox,
}

/// Failed batch item in the default result shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Failure description.
    pub error: String,
    /// Always `false`.
    pub solar_present: bool,
    /// Always `0.0`.
    pub solar_area_m2: f64,
}

impl ErrorRecord {
    /// Build the record for a failure.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            solar_present: false,
            solar_area_m2: 0.0,
        }
    }
}

impl From<&Error> for ErrorRecord {
    fn from(error: &Error) -> Self {
        Self::new(error.to_string())
    }
}

/// Outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    /// Query completed.
    Success(InferenceResult),
    /// Query failed; the rest of the batch is unaffected.
    Failure(ErrorRecord),
}

/// One batch item tagged with the caller's id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    /// Caller-supplied id.
    pub user_id: String,
    /// Result or error fields, flattened next to `user_id`.
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchRecord {
    /// True for error records.
    pub const fn is_error(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Failure(_))
    }

    /// The successful result, if any.
    pub const fn result(&self) -> Option<&InferenceResult> {
        match &self.outcome {
            BatchOutcome::Success(result) => Some(result),
            BatchOutcome::Failure(_) => None,
        }
    }

    /// `solar_present` of either variant.
    pub const fn solar_present(&self) -> bool {
        match &self.outcome {
            BatchOutcome::Success(result) => result.solar_present,
            BatchOutcome::Failure(record) => record.solar_present,
        }
    }

    /// `solar_area_m2` of either variant.
    pub const fn solar_area_m2(&self) -> f64 {
        match &self.outcome {
            BatchOutcome::Success(result) => result.solar_area_m2,
            BatchOutcome::Failure(record) => record.solar_area_m2,
        }
    }
}

/// Batch output wrapper: `{"results": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    /// Records in input order.
    pub results: Vec<BatchRecord>,
}

/// Structured failure of a single query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// HTTP-analogous status code.
    pub status: u16,
    /// Stable error code, e.g. `model_not_loaded`.
    pub error: &'static str,
    /// Human-readable detail.
    pub detail: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            status: error.status_code(),
            error: error.kind().code(),
            detail: error.to_string(),
        }
    }
}

impl From<Error> for ErrorResponse {
    fn from(error: Error) -> Self {
        Self::from(&error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_result() -> InferenceResult {
        InferenceResult {
            solar_present: true,
            solar_area_m2: 12.5,
            confidence: 0.5,
            bbox_list: vec![PixelBox::from([220.7, 270.0, 420.0, 370.2])],
            is_fallback_image: true,
            latitude: 12.9716,
            longitude: 77.5946,
            zoom: ZoomLevel::new(20),
            buffer_sqft: 1200,
            query_bounds: BoundingBox {
                min_lon: 77.0,
                min_lat: 12.0,
                max_lon: 78.0,
                max_lat: 13.0,
            },
        }
    }

    #[test]
    fn test_success_record_flattens_result() {
        let record = BatchRecord {
            user_id: "house-1".to_string(),
            outcome: BatchOutcome::Success(sample_result()),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["user_id"], "house-1");
        assert_eq!(value["solar_present"], true);
        assert_eq!(value["bbox_list"], json!([[220, 270, 420, 370]]));
        assert_eq!(value["zoom"], 20);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_error_record_shape() {
        let record = BatchRecord {
            user_id: "bad".to_string(),
            outcome: BatchOutcome::Failure(ErrorRecord::from(&Error::InvalidLatitude {
                value: 999.0,
            })),
        };
        assert!(record.is_error());
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"user_id":"bad","error":"invalid latitude: 999 (must be -90.0 to 90.0)","solar_present":false,"solar_area_m2":0.0}"#
        );
    }

    #[test]
    fn test_error_response_from_error() {
        let response = ErrorResponse::from(Error::ModelNotLoaded);
        assert_eq!(response.status, 503);
        assert_eq!(response.error, "model_not_loaded");
        assert_eq!(response.detail, "model not loaded");
    }
}
