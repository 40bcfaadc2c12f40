//! YOLO polygon labels and ground-truth rasterization.

use crate::inference::BinaryMask;

/// A labelled polygon in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Class id from the label line.
    pub class_id: u32,
    /// Vertices as `(x, y)` pixels.
    pub points: Vec<(f64, f64)>,
}

impl Polygon {
    /// Axis-aligned bounds as `(xmin, ymin, xmax, ymax)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.points.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }

    /// Even-odd point containment.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.points[i];
            let (xj, yj) = self.points[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Parse YOLO polygon label text for an image of `width x height`.
///
/// Each line is `<class> x1 y1 x2 y2 ...` with coordinates normalized to
/// `[0, 1]`. Lines that do not parse, polygons with fewer than three points,
/// and polygons with zero-width or zero-height bounds are skipped.
pub fn parse_yolo_polygons(contents: &str, width: u32, height: u32) -> Vec<Polygon> {
    let (w, h) = (f64::from(width), f64::from(height));
    contents
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let class_id = fields.next()?.parse::<f64>().ok()?;
            let coords: Vec<f64> = fields.map(str::parse).collect::<Result<_, _>>().ok()?;

            let points: Vec<(f64, f64)> = coords
                .chunks_exact(2)
                .map(|pair| (pair[0] * w, pair[1] * h))
                .collect();
            if points.len() < 3 {
                return None;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let polygon = Polygon {
                class_id: class_id as u32,
                points,
            };
            let (x0, y0, x1, y1) = polygon.bounds();
            (x1 > x0 && y1 > y0).then_some(polygon)
        })
        .collect()
}

/// Union of polygon masks, sampled at pixel centers.
pub fn rasterize_polygons(polygons: &[Polygon], width: u32, height: u32) -> BinaryMask {
    let mut mask = BinaryMask::empty(width, height);
    for polygon in polygons {
        let (x0, y0, x1, y1) = polygon.bounds();
        let (cols, rows) = (pixel_span(x0, x1, width), pixel_span(y0, y1, height));
        for y in rows.clone() {
            for x in cols.clone() {
                if polygon.contains(f64::from(x) + 0.5, f64::from(y) + 0.5) {
                    mask.set(x, y, true);
                }
            }
        }
    }
    mask
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_span(lo: f64, hi: f64, limit: u32) -> std::ops::Range<u32> {
    let clamp = |v: f64| v.clamp(0.0, f64::from(limit)) as u32;
    clamp(lo.floor())..clamp(hi.ceil())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_degenerate_lines() {
        let text = "0 0.1 0.1 0.5 0.1 0.5 0.5 0.1 0.5\n\
                    0 0.1 0.1 0.2 0.2\n\
                    0 0.1 0.1 0.5 0.1 0.9 0.1\n\
                    garbage\n";
        let polygons = parse_yolo_polygons(text, 100, 200);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].class_id, 0);
        assert_eq!(polygons[0].points[2], (50.0, 100.0));
    }

    #[test]
    fn test_rasterize_square() {
        let polygons = parse_yolo_polygons("0 0.2 0.2 0.6 0.2 0.6 0.6 0.2 0.6", 10, 10);
        let mask = rasterize_polygons(&polygons, 10, 10);
        assert_eq!(mask.pixel_count(), 16);
        assert!(mask.get(2, 2));
        assert!(mask.get(5, 5));
        assert!(!mask.get(6, 6));
        assert!(!mask.get(1, 2));
    }

    #[test]
    fn test_rasterize_triangle_and_union() {
        let polygons = parse_yolo_polygons(
            "0 0 0 1 0 0 1\n0 0.0 0.0 0.5 0.0 0.5 0.5 0.0 0.5",
            4,
            4,
        );
        let mask = rasterize_polygons(&polygons, 4, 4);
        // triangle covers the 6 centers below the anti-diagonal; square adds none
        assert_eq!(mask.pixel_count(), 6);
        assert!(mask.get(0, 0));
        assert!(!mask.get(3, 3));
    }

    #[test]
    fn test_polygon_outside_image_is_clipped() {
        let polygons = parse_yolo_polygons("0 -1 -1 2 -1 2 2 -1 2", 3, 3);
        assert_eq!(rasterize_polygons(&polygons, 3, 3).pixel_count(), 9);
    }
}
