//! The solar detection service: model lifecycle plus the liveness, single
//! query and batch interfaces.
//!
//! The service starts even without usable weights; detection requests then
//! fail with `model_not_loaded` (status 503) while liveness keeps answering.

mod loader;

pub use loader::{ModelState, load_engine, resolve_weights};

use crate::config::{Config, artifacts_dir, base_weights_path, validate_config, weights_path};
use crate::constants::service;
use crate::error::{Error, Result};
use crate::imagery::ImageryProvider;
use crate::inference::{ComputeDevice, DetectionEngine, select_device};
use crate::output::{BatchResponse, ErrorResponse, InferenceResult};
use crate::pipeline::{BatchLocation, InferenceOrchestrator, QueryOutput, run_batch};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Liveness report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Always `"ok"` while the process is up.
    pub status: &'static str,
    /// Device the model runs on.
    pub device: ComputeDevice,
    /// Which model is loaded.
    pub model: ModelState,
}

/// Long-lived service state.
#[derive(Debug, Clone)]
pub struct SolarService {
    orchestrator: Option<Arc<InferenceOrchestrator>>,
    device: ComputeDevice,
    artifacts_dir: PathBuf,
    batch_concurrency: usize,
}

impl SolarService {
    /// Start the service from configuration.
    ///
    /// Selects the device, creates the artifacts directory and loads the
    /// model. Missing or broken weights leave the service in the
    /// `not_loaded` state instead of failing.
    pub fn start(config: &Config, api_key: Option<String>) -> Result<Self> {
        validate_config(config)?;

        let artifacts_dir = artifacts_dir(config)?;
        std::fs::create_dir_all(&artifacts_dir)?;

        let device = select_device(config.inference.device);
        let imagery = ImageryProvider::from_config(&config.imagery, api_key)?;
        let raster_size = config.imagery.raster_size()?;

        let engine = load_engine(
            &weights_path(config)?,
            &base_weights_path(config)?,
            config.thresholds.detection(),
            device,
        );
        let orchestrator = engine.map(|engine| {
            Arc::new(InferenceOrchestrator::new(
                Arc::new(engine),
                Arc::new(imagery),
                raster_size,
                config.thresholds.live_min_confidence,
            ))
        });

        let service = Self::from_parts(
            orchestrator,
            device,
            artifacts_dir,
            config.service.batch_concurrency,
        );
        info!(
            "Service ready: device={}, model={}",
            service.device,
            service.model_state()
        );
        Ok(service)
    }

    /// Assemble a service from already-built parts.
    pub fn from_parts(
        orchestrator: Option<Arc<InferenceOrchestrator>>,
        device: ComputeDevice,
        artifacts_dir: PathBuf,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            orchestrator,
            device,
            artifacts_dir,
            batch_concurrency: batch_concurrency.max(service::DEFAULT_BATCH_CONCURRENCY),
        }
    }

    /// Which model is loaded.
    pub fn model_state(&self) -> ModelState {
        self.orchestrator
            .as_ref()
            .map_or(ModelState::NotLoaded, |o| o.engine().weights().into())
    }

    /// Directory query rasters are saved to.
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// The query orchestrator, if a model is loaded.
    pub fn orchestrator(&self) -> Result<&Arc<InferenceOrchestrator>> {
        self.orchestrator.as_ref().ok_or(Error::ModelNotLoaded)
    }

    /// The detection engine, if a model is loaded.
    pub fn engine(&self) -> Result<&DetectionEngine> {
        self.orchestrator().map(|o| o.engine())
    }

    /// Liveness. Never fails.
    pub fn health(&self) -> Health {
        Health {
            status: service::STATUS_OK,
            device: self.device,
            model: self.model_state(),
        }
    }

    /// Single-coordinate query.
    pub fn infer(
        &self,
        lat: f64,
        lon: f64,
        buffer_sqft: Option<u32>,
    ) -> std::result::Result<InferenceResult, ErrorResponse> {
        self.query(lat, lon, buffer_sqft)
            .map(|output| output.result)
            .map_err(ErrorResponse::from)
    }

    /// Single-coordinate query that also saves the analysed raster to the
    /// artifacts directory.
    pub fn infer_and_save(
        &self,
        lat: f64,
        lon: f64,
        buffer_sqft: Option<u32>,
    ) -> std::result::Result<(InferenceResult, PathBuf), ErrorResponse> {
        let output = self.query(lat, lon, buffer_sqft)?;
        let path = self
            .artifacts_dir
            .join(artifact_file_name(&Local::now(), &output.result));
        output.raster.save(&path)?;
        info!("Saved query image to {}", path.display());
        Ok((output.result, path))
    }

    fn query(&self, lat: f64, lon: f64, buffer_sqft: Option<u32>) -> Result<QueryOutput> {
        self.orchestrator()?.query(lat, lon, buffer_sqft)
    }

    /// Batch query. Per-item failures become error records; the call itself
    /// only fails when no model is loaded.
    pub fn batch_infer(
        &self,
        locations: &[BatchLocation],
        show_progress: bool,
    ) -> std::result::Result<BatchResponse, ErrorResponse> {
        let orchestrator = self.orchestrator()?;
        let results = run_batch(orchestrator, locations, self.batch_concurrency, show_progress)?;
        Ok(BatchResponse { results })
    }
}

/// `<timestamp>_<lat>_<lon>_z<zoom>.png`
pub fn artifact_file_name(timestamp: &DateTime<Local>, result: &InferenceResult) -> String {
    format!(
        "{}_{}_{}_z{}.png",
        timestamp.format("%Y%m%d_%H%M%S"),
        result.latitude,
        result.longitude,
        result.zoom
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geo::{BoundingBox, ZoomLevel};
    use chrono::TimeZone;

    #[test]
    fn test_service_without_model() {
        let service = SolarService::from_parts(None, ComputeDevice::Cpu, PathBuf::from("."), 1);
        let health = service.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.model, ModelState::NotLoaded);

        let err = service.infer(12.9716, 77.5946, None).unwrap_err();
        assert_eq!(err.status, 503);
        assert_eq!(err.error, "model_not_loaded");
        assert_eq!(service.batch_infer(&[], false).unwrap_err().status, 503);
    }

    #[test]
    fn test_health_serialization() {
        let service = SolarService::from_parts(None, ComputeDevice::Cpu, PathBuf::from("."), 1);
        assert_eq!(
            serde_json::to_string(&service.health()).unwrap(),
            r#"{"status":"ok","device":"cpu","model":"not_loaded"}"#
        );
    }

    #[test]
    fn test_artifact_file_name() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let result = InferenceResult {
            solar_present: false,
            solar_area_m2: 0.0,
            confidence: 0.0,
            bbox_list: vec![],
            is_fallback_image: true,
            latitude: 12.9716,
            longitude: 77.5946,
            zoom: ZoomLevel::new(20),
            buffer_sqft: 1200,
            query_bounds: BoundingBox {
                min_lon: 0.0,
                min_lat: 0.0,
                max_lon: 0.0,
                max_lat: 0.0,
            },
        };
        assert_eq!(
            artifact_file_name(&timestamp, &result),
            "20240305_140709_12.9716_77.5946_z20.png"
        );
    }
}
