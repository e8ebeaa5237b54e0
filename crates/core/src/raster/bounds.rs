//! Geographic bounding boxes and their pixel footprints

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A rectangular region in geographic degrees (or any planar CRS unit).
///
/// Always satisfies `min_x < max_x` and `min_y < max_y` when built through
/// [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge (minimum longitude)
    pub min_x: f64,
    /// Southern edge (minimum latitude)
    pub min_y: f64,
    /// Eastern edge (maximum longitude)
    pub max_x: f64,
    /// Northern edge (maximum latitude)
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a validated bounding box from (min_lon, min_lat, max_lon, max_lat)
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidBounds {
            min_x,
            min_y,
            max_x,
            max_y,
            reason: reason.to_string(),
        };

        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return Err(invalid("coordinates must be finite"));
        }
        if min_x >= max_x {
            return Err(invalid("min_x must be less than max_x"));
        }
        if min_y >= max_y {
            return Err(invalid("min_y must be less than max_y"));
        }

        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Width along the x axis
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height along the y axis
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Midpoint latitude, the reference latitude for degree-to-meter scaling
    pub fn center_y(&self) -> f64 {
        (self.min_y + self.max_y) / 2.0
    }

    /// Whether the point (x, y) lies inside or on the edge of this box
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.6}, {:.6})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

impl std::str::FromStr for BoundingBox {
    type Err = Error;

    /// Parse "min_lon,min_lat,max_lon,max_lat"
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(Error::InvalidParameter {
                name: "bbox",
                value: s.to_string(),
                reason: "expected 'min_lon,min_lat,max_lon,max_lat'".to_string(),
            });
        }

        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| Error::InvalidParameter {
                name: "bbox",
                value: s.to_string(),
                reason: format!("'{}' is not a number", part),
            })?;
        }

        BoundingBox::new(values[0], values[1], values[2], values[3])
    }
}

/// A rectangular block of pixels inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    /// First row of the window
    pub row_offset: usize,
    /// First column of the window
    pub col_offset: usize,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl PixelWindow {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// One past the last row
    pub fn row_end(&self) -> usize {
        self.row_offset + self.rows
    }

    /// One past the last column
    pub fn col_end(&self) -> usize {
        self.col_offset + self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}
