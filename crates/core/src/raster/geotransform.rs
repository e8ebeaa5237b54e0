//! North-up affine georeferencing

use serde::{Deserialize, Serialize};

use super::{BoundingBox, PixelWindow};

/// Tolerance used when snapping fractional pixel edges to whole pixels
const SNAP_EPSILON: f64 = 1e-9;

/// Maps pixel corners to map coordinates:
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for the usual north-up layout, so row 0 is
/// the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the upper-left corner
    pub origin_x: f64,
    /// Y of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinates of the top-left corner of pixel (col, row)
    pub fn corner(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y + row as f64 * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a map coordinate; NaN for a degenerate transform
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Absolute pixel width and height in CRS units
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    /// (min_x, min_y, max_x, max_y) of a `width` x `height` raster
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.corner(0, 0);
        let (x1, y1) = self.corner(width, height);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Bounding box of a raster of given dimensions
    pub fn extent(&self, width: usize, height: usize) -> crate::Result<BoundingBox> {
        let (min_x, min_y, max_x, max_y) = self.bounds(width, height);
        BoundingBox::new(min_x, min_y, max_x, max_y)
    }

    /// Pixel window of a `width` x `height` raster covered by `bbox`.
    ///
    /// Every pixel that overlaps the box is included, clipped to the raster.
    /// Returns `None` when the box does not intersect the raster.
    pub fn window_for(&self, bbox: &BoundingBox, width: usize, height: usize) -> Option<PixelWindow> {
        let (c0, r0) = self.geo_to_pixel(bbox.min_x, bbox.max_y);
        let (c1, r1) = self.geo_to_pixel(bbox.max_x, bbox.min_y);
        if !(c0.is_finite() && c1.is_finite() && r0.is_finite() && r1.is_finite()) {
            return None;
        }

        let (c0, c1) = (c0.min(c1), c0.max(c1));
        let (r0, r1) = (r0.min(r1), r0.max(r1));

        let col_start = (c0 + SNAP_EPSILON).floor().max(0.0);
        let row_start = (r0 + SNAP_EPSILON).floor().max(0.0);
        let col_end = (c1 - SNAP_EPSILON).ceil().min(width as f64);
        let row_end = (r1 - SNAP_EPSILON).ceil().min(height as f64);

        if col_end <= col_start || row_end <= row_start {
            return None;
        }

        let window = PixelWindow::new(
            row_start as usize,
            col_start as usize,
            (row_end - row_start) as usize,
            (col_end - col_start) as usize,
        );
        (!window.is_empty()).then_some(window)
    }

    /// Transform of a sub-raster starting at the window's top-left pixel
    pub fn for_window(&self, window: &PixelWindow) -> GeoTransform {
        let (origin_x, origin_y) = self.corner(window.col_offset, window.row_offset);
        GeoTransform {
            origin_x,
            origin_y,
            ..*self
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_corner_and_inverse() {
        let gt = GeoTransform::new(100.0, 200.0, 10.0, -10.0);
        let (x, y) = gt.corner(5, 10);
        assert_relative_eq!(x, 150.0);
        assert_relative_eq!(y, 100.0);

        let (col, row) = gt.geo_to_pixel(x + 5.0, y - 5.0);
        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 1.0, -1.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(100, 50);

        assert_relative_eq!(min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, 50.0, epsilon = 1e-10);
        assert_relative_eq!(max_x, 100.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_degenerate_transform_has_no_window() {
        let gt = GeoTransform::new(0.0, 0.0, 0.0, 0.0);
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(gt.window_for(&bbox, 10, 10), None);
    }

    #[test]
    fn test_window_for_inner_box() {
        // 0.1 degree pixels, 20 x 10 raster covering (-9, 40) - (-7, 41)
        let gt = GeoTransform::new(-9.0, 41.0, 0.1, -0.1);
        let bbox = BoundingBox::new(-8.5, 40.2, -8.0, 40.6).unwrap();
        let w = gt.window_for(&bbox, 20, 10).unwrap();

        assert_eq!(w, PixelWindow::new(4, 5, 4, 5));

        let sub = gt.for_window(&w);
        assert_relative_eq!(sub.origin_x, -8.5, epsilon = 1e-10);
        assert_relative_eq!(sub.origin_y, 40.6, epsilon = 1e-10);
    }

    #[test]
    fn test_window_for_partial_pixels_included() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let bbox = BoundingBox::new(0.5, 0.5, 2.5, 9.5).unwrap();
        let w = gt.window_for(&bbox, 10, 10).unwrap();
        assert_eq!(w, PixelWindow::new(0, 0, 10, 3));
    }

    #[test]
    fn test_window_for_clips_and_misses() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let overhanging = BoundingBox::new(-5.0, -5.0, 3.0, 15.0).unwrap();
        assert_eq!(
            gt.window_for(&overhanging, 10, 10),
            Some(PixelWindow::new(0, 0, 10, 3))
        );

        let outside = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();
        assert_eq!(gt.window_for(&outside, 10, 10), None);
    }
}
