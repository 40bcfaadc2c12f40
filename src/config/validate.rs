//! Configuration validation.

use crate::config::{Config, ThresholdsConfig};
use crate::constants::thresholds::RANGE;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_thresholds(&config.thresholds)?;

    if config.imagery.timeout_secs == 0 {
        return Err(Error::ConfigValidation {
            message: "imagery.timeout_secs must be at least 1".to_string(),
        });
    }

    config
        .imagery
        .raster_size()
        .map_err(|e| Error::ConfigValidation {
            message: format!("imagery.image_size: {e}"),
        })?;

    if config.service.batch_concurrency == 0 {
        return Err(Error::ConfigValidation {
            message: "service.batch_concurrency must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Every threshold must lie in `[0, 1]`.
fn validate_thresholds(thresholds: &ThresholdsConfig) -> Result<()> {
    let named = [
        ("score", thresholds.score),
        ("nms", thresholds.nms),
        ("mask", thresholds.mask),
        ("live_min_confidence", thresholds.live_min_confidence),
        ("report_min_confidence", thresholds.report_min_confidence),
        (
            "evaluation_min_confidence",
            thresholds.evaluation_min_confidence,
        ),
    ];

    for (name, value) in named {
        if !RANGE.contains(&value) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "thresholds.{name} must be between {} and {}, got {value}",
                    RANGE.start(),
                    RANGE.end()
                ),
            });
        }
    }

    Ok(())
}
