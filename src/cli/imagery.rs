//! `imagery check` and `imagery fallback`.

use crate::constants::imagery::{CHECK_LATITUDE, CHECK_LONGITUDE, CHECK_ZOOM};
use crate::error::Result;
use crate::geo::{Coordinate, ZoomLevel};
use crate::imagery::{ImageryProvider, Raster, RasterSize, generate_fallback_raster};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name of the image saved by a successful key check.
pub const CHECK_IMAGE_FILE: &str = "imagery_check.png";

/// Outcome of an API key check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCheck {
    /// True when the provider returned a decodable image.
    pub valid: bool,
    /// HTTP status, when a request was made.
    pub status: Option<u16>,
    /// Response body size in bytes.
    pub bytes: usize,
    /// Where the fetched image was saved.
    pub saved_to: Option<PathBuf>,
    /// Why the check failed.
    pub error: Option<String>,
}

impl KeyCheck {
    fn failed(status: Option<u16>, bytes: usize, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            status,
            bytes,
            saved_to: None,
            error: Some(error.into()),
        }
    }
}

/// Fetch a fixed 640x640 zoom-20 image and save it into `artifacts_dir`.
pub fn check_key(provider: &ImageryProvider, artifacts_dir: &Path) -> Result<KeyCheck> {
    let coordinate = Coordinate::new(CHECK_LATITUDE, CHECK_LONGITUDE)?;
    let Some(response) =
        provider.request(coordinate, ZoomLevel::new(CHECK_ZOOM), RasterSize::default())
    else {
        warn!("No imagery API key configured");
        return Ok(KeyCheck::failed(None, 0, "no API key configured"));
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => return Ok(KeyCheck::failed(None, 0, e.to_string())),
    };
    let bytes = response.body.len();
    info!("Imagery provider answered HTTP {} ({} bytes)", response.status, bytes);

    if !response.is_ok() {
        let body = String::from_utf8_lossy(&response.body);
        return Ok(KeyCheck::failed(
            Some(response.status),
            bytes,
            body.chars().take(200).collect::<String>(),
        ));
    }

    let raster = match Raster::decode(&response.body) {
        Ok(raster) => raster,
        Err(e) => return Ok(KeyCheck::failed(Some(response.status), bytes, e.to_string())),
    };
    std::fs::create_dir_all(artifacts_dir)?;
    let path = artifacts_dir.join(CHECK_IMAGE_FILE);
    raster.save(&path)?;

    Ok(KeyCheck {
        valid: true,
        status: Some(response.status),
        bytes,
        saved_to: Some(path),
        error: None,
    })
}

/// Write the fallback raster to `output`.
pub fn write_fallback(output: &Path, size: RasterSize) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    generate_fallback_raster(size).save(output)?;
    info!("Wrote {} fallback image to {}", size, output.display());
    Ok(())
}
