//! Resolves a `(lat, lon, zoom)` query to a raster.

use super::client::{HttpResponse, ImageryHttpClient, ReqwestClient, redact_key};
use super::fallback::generate_fallback_raster;
use super::raster::{Raster, RasterSize};
use crate::config::ImageryConfig;
use crate::constants::imagery::MAP_TYPE;
use crate::error::Result;
use crate::geo::{Coordinate, ZoomLevel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Why the fallback raster was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No API key configured; no request was made.
    NoCredential,
    /// Provider answered with a non-200 status.
    Status(u16),
    /// Transport failure or timeout.
    Transport(String),
    /// Body was not a decodable image.
    Decode(String),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCredential => write!(f, "no API key configured"),
            Self::Status(status) => write!(f, "provider returned HTTP {status}"),
            Self::Transport(reason) => write!(f, "transport failure: {reason}"),
            Self::Decode(reason) => write!(f, "undecodable image: {reason}"),
        }
    }
}

/// Outcome of an imagery fetch.
///
/// Callers must match on the variant, so the fallback flag cannot be lost.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageryOutcome {
    /// Live imagery from the provider.
    Fetched(Raster),
    /// Deterministic synthetic raster.
    Fallback {
        /// The synthetic raster.
        raster: Raster,
        /// Why live imagery was not used.
        reason: FallbackReason,
    },
}

impl ImageryOutcome {
    /// True when the synthetic raster was substituted.
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Borrow the raster.
    pub const fn raster(&self) -> &Raster {
        match self {
            Self::Fetched(raster) | Self::Fallback { raster, .. } => raster,
        }
    }

    /// Take the raster and the fallback flag.
    pub fn into_parts(self) -> (Raster, bool) {
        match self {
            Self::Fetched(raster) => (raster, false),
            Self::Fallback { raster, .. } => (raster, true),
        }
    }
}

/// Static-map imagery source with a deterministic offline fallback.
#[derive(Clone)]
pub struct ImageryProvider {
    api_key: Option<String>,
    endpoint: String,
    client: Option<Arc<dyn ImageryHttpClient>>,
}

impl std::fmt::Debug for ImageryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageryProvider")
            .field("endpoint", &self.endpoint)
            .field("has_credential", &self.has_credential())
            .finish_non_exhaustive()
    }
}

impl ImageryProvider {
    /// Build a provider from configuration.
    ///
    /// The HTTP client is only created when an API key is present.
    pub fn from_config(config: &ImageryConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let client: Option<Arc<dyn ImageryHttpClient>> = if api_key.is_some() {
            Some(Arc::new(ReqwestClient::with_timeout(Duration::from_secs(
                config.timeout_secs,
            ))?))
        } else {
            info!("No imagery API key configured, using fallback imagery");
            None
        };

        Ok(Self {
            api_key,
            endpoint: config.endpoint.clone(),
            client,
        })
    }

    /// Provider with an injected client.
    pub fn with_client(
        client: Arc<dyn ImageryHttpClient>,
        api_key: Option<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.into(),
            client: Some(client),
        }
    }

    /// Provider that never touches the network.
    pub fn offline() -> Self {
        Self {
            api_key: None,
            endpoint: crate::constants::imagery::STATIC_MAP_ENDPOINT.to_string(),
            client: None,
        }
    }

    /// True when live imagery will be attempted.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some() && self.client.is_some()
    }

    /// Static map URL for a query.
    pub fn static_map_url(&self, coordinate: Coordinate, zoom: ZoomLevel, size: RasterSize) -> String {
        format!(
            "{}?center={},{}&zoom={}&size={}&maptype={}&key={}",
            self.endpoint,
            coordinate.lat,
            coordinate.lon,
            zoom,
            size,
            MAP_TYPE,
            self.api_key.as_deref().unwrap_or_default()
        )
    }

    /// Raw GET of the static map for a query.
    ///
    /// `None` when no credential is configured.
    pub fn request(
        &self,
        coordinate: Coordinate,
        zoom: ZoomLevel,
        size: RasterSize,
    ) -> Option<Result<HttpResponse>> {
        let client = self.client.as_ref().filter(|_| self.api_key.is_some())?;
        Some(client.get(&self.static_map_url(coordinate, zoom, size)))
    }

    /// Fetch the raster for a query.
    ///
    /// Never fails: any transport, status or decode problem yields the
    /// fallback raster.
    pub fn fetch(&self, coordinate: Coordinate, zoom: ZoomLevel, size: RasterSize) -> ImageryOutcome {
        let reason = match self.request(coordinate, zoom, size) {
            None => FallbackReason::NoCredential,
            Some(Err(e)) => FallbackReason::Transport(e.to_string()),
            Some(Ok(response)) if !response.is_ok() => {
                let body = String::from_utf8_lossy(&response.body);
                warn!(
                    "Imagery provider returned HTTP {}: {}",
                    response.status,
                    body.chars().take(200).collect::<String>()
                );
                FallbackReason::Status(response.status)
            }
            Some(Ok(response)) => match Raster::decode(&response.body) {
                Ok(raster) => {
                    info!(
                        "Fetched imagery for {}, {} at zoom {}",
                        coordinate.lat, coordinate.lon, zoom
                    );
                    return ImageryOutcome::Fetched(raster);
                }
                Err(e) => FallbackReason::Decode(e.to_string()),
            },
        };

        if reason == FallbackReason::NoCredential {
            info!("Using fallback imagery ({})", reason);
        } else {
            warn!(
                "Using fallback imagery for {} ({})",
                redact_key(&self.static_map_url(coordinate, zoom, size)),
                reason
            );
        }

        ImageryOutcome::Fallback {
            raster: generate_fallback_raster(size),
            reason,
        }
    }
}
