//! RGB raster type shared by the imagery provider and the detection engine.

use crate::error::{Error, Result};
use image::{Rgb, RgbImage};
use std::path::Path;
use std::str::FromStr;

/// Requested raster dimensions, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RasterSize {
    /// Build a size from explicit dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for RasterSize {
    fn default() -> Self {
        Self::new(640, 640)
    }
}

impl FromStr for RasterSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidImageSize {
            value: s.to_string(),
        };
        let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = width.trim().parse().map_err(|_| invalid())?;
        let height: u32 = height.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl std::fmt::Display for RasterSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An RGB image with 8 bits per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    image: RgbImage,
}

impl Raster {
    /// Wrap an existing RGB image.
    pub const fn from_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Solid raster of the given size and colour.
    pub fn filled(size: RasterSize, rgb: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(size.width, size.height, Rgb(rgb)),
        }
    }

    /// Decode PNG/JPEG bytes, converting to RGB.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| Error::ImageDecode {
            reason: e.to_string(),
        })?;
        Ok(Self {
            image: image.to_rgb8(),
        })
    }

    /// Read an image file from disk, converting to RGB.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|e| Error::ImageRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            image: image.to_rgb8(),
        })
    }

    /// Write the raster to disk; format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path).map_err(|e| Error::ImageWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Dimensions.
    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.width(), self.height())
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Interleaved `RGBRGB...` bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Planar `[3, H, W]` floats scaled to `[0, 1]`.
    pub fn to_chw_f32(&self) -> Vec<f32> {
        let plane = self.image.width() as usize * self.image.height() as usize;
        let mut chw = vec![0.0_f32; plane * 3];
        for (i, pixel) in self.image.pixels().enumerate() {
            for (c, value) in pixel.0.iter().enumerate() {
                chw[c * plane + i] = f32::from(*value) / 255.0;
            }
        }
        chw
    }

    /// Mutable access for painters in this module tree.
    pub(crate) const fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_size_parse() {
        assert_eq!(
            "640x640".parse::<RasterSize>().ok(),
            Some(RasterSize::new(640, 640))
        );
        assert_eq!(
            " 320X200 ".parse::<RasterSize>().ok(),
            Some(RasterSize::new(320, 200))
        );
        assert!("640".parse::<RasterSize>().is_err());
        assert!("0x640".parse::<RasterSize>().is_err());
        assert!("axb".parse::<RasterSize>().is_err());
        assert_eq!(RasterSize::new(640, 480).to_string(), "640x480");
    }

    #[test]
    fn test_to_chw_layout() {
        let mut raster = Raster::filled(RasterSize::new(2, 1), [0, 0, 0]);
        raster.image_mut().put_pixel(1, 0, Rgb([255, 51, 0]));
        let chw = raster.to_chw_f32();
        assert_eq!(chw.len(), 6);
        // R plane, G plane, B plane
        assert_eq!(chw[1], 1.0);
        assert!((chw[3] - 0.2).abs() < 1e-6);
        assert_eq!(chw[5], 0.0);
    }

    #[test]
    fn test_decode_round_trips_png() {
        let raster = Raster::filled(RasterSize::new(4, 3), [10, 20, 30]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.png");
        raster.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded = Raster::decode(&bytes).unwrap();
        assert_eq!(decoded, raster);
        assert_eq!(Raster::open(&path).unwrap().pixel(3, 2), Some([10, 20, 30]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Raster::decode(b"not an image").unwrap_err(),
            Error::ImageDecode { .. }
        ));
    }
}
