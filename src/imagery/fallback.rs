//! Deterministic synthetic raster used when live imagery is unavailable.
//!
//! The scene is a grass background, a vertical road, a house roof and a dark
//! solar panel with grid lines on the roof, plus a three-line notice in the
//! top-left corner. The panel is always present so an undertrained model
//! still has a target to fire on.

use super::glyphs::draw_text;
use super::raster::{Raster, RasterSize};
use crate::constants::fallback as layout;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;

/// Pixel rectangle with inclusive corners, in signed coordinates so layout
/// math can run off the raster edge before clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left column (inclusive).
    pub x1: i64,
    /// Top row (inclusive).
    pub y1: i64,
    /// Right column (inclusive).
    pub x2: i64,
    /// Bottom row (inclusive).
    pub y2: i64,
}

/// Layout of the fallback scene for a given raster size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackLayout {
    /// Road band.
    pub road: Rect,
    /// House roof.
    pub house: Rect,
    /// Solar panel.
    pub panel: Rect,
}

impl FallbackLayout {
    /// Compute the layout for `size`.
    pub fn for_size(size: RasterSize) -> Self {
        let width = i64::from(size.width);
        let height = i64::from(size.height);
        let cx = width / 2;
        let cy = height / 2;

        let road = Rect {
            x1: cx - layout::ROAD_HALF_WIDTH,
            y1: 0,
            x2: cx + layout::ROAD_HALF_WIDTH,
            y2: height,
        };
        let house = Rect {
            x1: cx - layout::HOUSE_HALF_WIDTH,
            y1: cy - layout::HOUSE_HALF_HEIGHT,
            x2: cx + layout::HOUSE_HALF_WIDTH,
            y2: cy + layout::HOUSE_HALF_HEIGHT,
        };
        let panel = Rect {
            x1: house.x1 + layout::PANEL_INSET,
            y1: house.y1 + layout::PANEL_INSET,
            x2: house.x2 - layout::PANEL_INSET,
            y2: house.y2 - layout::PANEL_INSET,
        };

        Self { road, house, panel }
    }
}

/// Paint the fallback scene at `size`.
///
/// Pure function of `size`: equal sizes give pixel-identical rasters.
pub fn generate_fallback_raster(size: RasterSize) -> Raster {
    let mut raster = Raster::filled(size, layout::BACKGROUND);
    let scene = FallbackLayout::for_size(size);
    let image = raster.image_mut();

    fill_rect(image, scene.road, layout::ROAD);
    fill_rect(image, scene.house, layout::HOUSE);
    fill_rect(image, scene.panel, layout::PANEL);

    let panel = scene.panel;
    for x in (panel.x1..panel.x2).step_by(layout::GRID_COLUMN_STEP) {
        fill_rect(
            image,
            Rect {
                x1: x,
                y1: panel.y1,
                x2: x,
                y2: panel.y2,
            },
            layout::GRID,
        );
    }
    for y in (panel.y1..panel.y2).step_by(layout::GRID_ROW_STEP) {
        fill_rect(
            image,
            Rect {
                x1: panel.x1,
                y1: y,
                x2: panel.x2,
                y2: y,
            },
            layout::GRID,
        );
    }

    for (x, y, text, color) in layout::WARNING_LINES {
        draw_text(image, x, y, text, color);
    }

    raster
}

fn fill_rect(image: &mut RgbImage, rect: Rect, color: [u8; 3]) {
    let (Ok(x), Ok(y)) = (i32::try_from(rect.x1), i32::try_from(rect.y1)) else {
        return;
    };
    let (Ok(width), Ok(height)) = (
        u32::try_from(rect.x2 - rect.x1 + 1),
        u32::try_from(rect.y2 - rect.y1 + 1),
    ) else {
        return;
    };
    if width == 0 || height == 0 {
        return;
    }
    // clipped to the image bounds by imageproc
    draw_filled_rect_mut(image, PixelRect::at(x, y).of_size(width, height), Rgb(color));
}
