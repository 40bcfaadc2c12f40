//! Per-coordinate query pipeline.
//!
//! `Received -> ImageAcquired -> Detected -> ResultBuilt`. Geometry and
//! detection failures short-circuit with an error; imagery failures never
//! do, they are absorbed into a fallback raster.

use crate::error::Result;
use crate::geo::{
    AreaRequest, BoundingBox, Coordinate, ZoomLevel, bounding_box_for_area,
    pixel_area_to_square_meters, zoom_level_for_area,
};
use crate::imagery::{ImageryProvider, Raster, RasterSize};
use crate::inference::{Detection, DetectionEngine};
use crate::output::InferenceResult;
use std::sync::Arc;
use tracing::{debug, info};

/// Query lifecycle stage, logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Inputs accepted.
    Received,
    /// Raster fetched or synthesized.
    ImageAcquired,
    /// Model run finished.
    Detected,
    /// Result record built.
    ResultBuilt,
}

/// Validated geometry of one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryContext {
    /// Query coordinate.
    pub coordinate: Coordinate,
    /// Buffer area in square feet.
    pub buffer_sqft: u32,
    /// Zoom the raster is imaged at.
    pub zoom: ZoomLevel,
    /// Ground window.
    pub bounds: BoundingBox,
}

impl QueryContext {
    /// Validate inputs and derive zoom and bounds.
    ///
    /// Unsupported buffer areas fall back to the default window.
    pub fn new(lat: f64, lon: f64, buffer_sqft: Option<u32>) -> Result<Self> {
        let coordinate = Coordinate::new(lat, lon)?.ensure_in_safe_band()?;
        let buffer_sqft = AreaRequest::from_sqft_or_default(buffer_sqft).sqft();
        Ok(Self {
            coordinate,
            buffer_sqft,
            zoom: zoom_level_for_area(buffer_sqft),
            bounds: bounding_box_for_area(lat, lon, buffer_sqft)?,
        })
    }
}

/// Result of a query together with the analysed raster.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    /// The result record.
    pub result: InferenceResult,
    /// The raster the model saw.
    pub raster: Raster,
}

/// Composes geometry, imagery and detection into one query.
#[derive(Debug, Clone)]
pub struct InferenceOrchestrator {
    engine: Arc<DetectionEngine>,
    imagery: Arc<ImageryProvider>,
    raster_size: RasterSize,
    min_confidence: f32,
}

impl InferenceOrchestrator {
    /// Build an orchestrator whose results keep detections scoring
    /// strictly above `min_confidence`.
    pub const fn new(
        engine: Arc<DetectionEngine>,
        imagery: Arc<ImageryProvider>,
        raster_size: RasterSize,
        min_confidence: f32,
    ) -> Self {
        Self {
            engine,
            imagery,
            raster_size,
            min_confidence,
        }
    }

    /// The wrapped detection engine.
    pub fn engine(&self) -> &DetectionEngine {
        &self.engine
    }

    /// Run one query and keep the raster.
    pub fn query(&self, lat: f64, lon: f64, buffer_sqft: Option<u32>) -> Result<QueryOutput> {
        let context = QueryContext::new(lat, lon, buffer_sqft)?;
        log_stage(QueryStage::Received, &context);

        let outcome = self
            .imagery
            .fetch(context.coordinate, context.zoom, self.raster_size);
        log_stage(QueryStage::ImageAcquired, &context);

        let detections = self.engine.detect(outcome.raster())?;
        log_stage(QueryStage::Detected, &context);

        let (raster, is_fallback) = outcome.into_parts();
        let result = build_result(&context, &detections, self.min_confidence, is_fallback);
        log_stage(QueryStage::ResultBuilt, &context);

        info!(
            "Query ({}, {}): solar_present={}, area={:.2} m2, confidence={:.2}, fallback={}",
            context.coordinate.lat,
            context.coordinate.lon,
            result.solar_present,
            result.solar_area_m2,
            result.confidence,
            result.is_fallback_image
        );

        Ok(QueryOutput { result, raster })
    }

    /// Run one query and return only the result.
    pub fn infer(&self, lat: f64, lon: f64, buffer_sqft: Option<u32>) -> Result<InferenceResult> {
        self.query(lat, lon, buffer_sqft).map(|output| output.result)
    }
}

fn log_stage(stage: QueryStage, context: &QueryContext) {
    debug!(
        "{:?}: ({}, {}) zoom {}",
        stage, context.coordinate.lat, context.coordinate.lon, context.zoom
    );
}

/// Turn detections into the result record.
///
/// `detections` must be sorted by descending score. Every detection scoring
/// strictly above `min_confidence` contributes its mask area, measured at the
/// query's `(lat, zoom)`; confidence is the top passing score.
pub fn build_result(
    context: &QueryContext,
    detections: &[Detection],
    min_confidence: f32,
    is_fallback_image: bool,
) -> InferenceResult {
    let passing: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.score > min_confidence)
        .collect();

    let pixel_count: u64 = passing.iter().map(|d| d.mask.pixel_count()).sum();
    let solar_area_m2 = if passing.is_empty() {
        0.0
    } else {
        pixel_area_to_square_meters(pixel_count, context.coordinate.lat, context.zoom)
    };

    InferenceResult {
        solar_present: !passing.is_empty(),
        solar_area_m2,
        confidence: passing.first().map_or(0.0, |d| d.score),
        bbox_list: passing.iter().map(|d| d.bbox).collect(),
        is_fallback_image,
        latitude: context.coordinate.lat,
        longitude: context.coordinate.lon,
        zoom: context.zoom,
        buffer_sqft: context.buffer_sqft,
        query_bounds: context.bounds,
    }
}
