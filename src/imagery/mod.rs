//! Imagery acquisition: live static-map fetch with a synthetic fallback.

mod client;
mod fallback;
mod glyphs;
mod provider;
mod raster;

pub use client::{HttpResponse, ImageryHttpClient, ReqwestClient, redact_key};
pub use fallback::{FallbackLayout, Rect, generate_fallback_raster};
pub use provider::{FallbackReason, ImageryOutcome, ImageryProvider};
pub use raster::{Raster, RasterSize};
