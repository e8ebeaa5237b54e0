//! Tile planning over a geographic region
//!
//! The region is cut into a grid of `tile_size` cells, ordered south to
//! north and west to east within a row. Each tile edge that borders another
//! tile is pushed outward by `overlap`; edges on the region's boundary stay
//! put, and every tile is clamped to the region.
//!
//! The overlap only raises the chance that a flood path crossing a seam is
//! seen by one of the two tiles. Tiles are still delineated independently.

use coastflood_core::raster::BoundingBox;
use coastflood_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default tile edge length in degrees
pub const DEFAULT_TILE_SIZE: f64 = 0.15;

/// Default overlap margin in degrees
pub const DEFAULT_OVERLAP: f64 = 0.005;

/// Slack for extents that are an exact multiple of the tile size but land
/// just above it in floating point
const COUNT_EPSILON: f64 = 1e-9;

/// Upper bound on the number of tiles in one plan
pub const MAX_TILES: usize = 1_000_000;

/// Tile grid configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilingParams {
    /// Tile edge length, in the region's units
    pub tile_size: f64,
    /// Margin added on interior edges
    pub overlap: f64,
}

impl Default for TilingParams {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl TilingParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: self.tile_size.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        if !(self.overlap.is_finite() && self.overlap >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "overlap",
                value: self.overlap.to_string(),
                reason: "must be zero or a positive number".to_string(),
            });
        }
        Ok(())
    }
}

/// One planned tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Position in processing order
    pub index: usize,
    /// Grid row, 0 at the southern edge
    pub row: usize,
    /// Grid column, 0 at the western edge
    pub col: usize,
    /// Extent including overlap
    pub bounds: BoundingBox,
}

impl Tile {
    /// File-name friendly label, e.g. `tile_r03_c01`
    pub fn label(&self) -> String {
        format!("tile_r{:02}_c{:02}", self.row, self.col)
    }
}

fn too_many_tiles(tile_size: f64) -> Error {
    Error::InvalidParameter {
        name: "tile_size",
        value: tile_size.to_string(),
        reason: format!("region would need more than {} tiles", MAX_TILES),
    }
}

fn axis_count(extent: f64, tile_size: f64) -> Result<usize> {
    let ratio = (extent / tile_size - COUNT_EPSILON).ceil();
    if !ratio.is_finite() || ratio > MAX_TILES as f64 {
        return Err(too_many_tiles(tile_size));
    }
    Ok((ratio as usize).max(1))
}

/// Number of tiles along (x, y).
///
/// Fails when the plan would exceed [`MAX_TILES`].
pub fn tile_counts(region: &BoundingBox, params: &TilingParams) -> Result<(usize, usize)> {
    params.validate()?;
    let region = BoundingBox::new(region.min_x, region.min_y, region.max_x, region.max_y)?;
    let nx = axis_count(region.width(), params.tile_size)?;
    let ny = axis_count(region.height(), params.tile_size)?;
    match nx.checked_mul(ny) {
        Some(total) if total <= MAX_TILES => Ok((nx, ny)),
        _ => Err(too_many_tiles(params.tile_size)),
    }
}

/// Partition `region` into overlapping tiles.
///
/// Fails before producing anything if the region or the parameters are
/// invalid.
pub fn plan_tiles(region: &BoundingBox, params: &TilingParams) -> Result<Vec<Tile>> {
    let (nx, ny) = tile_counts(region, params)?;
    let size = params.tile_size;
    let overlap = params.overlap;

    let mut tiles = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        let mut min_y = region.min_y + row as f64 * size;
        let mut max_y = if row + 1 == ny {
            region.max_y
        } else {
            (min_y + size).min(region.max_y)
        };
        if row > 0 {
            min_y -= overlap;
        }
        if row + 1 < ny {
            max_y += overlap;
        }

        for col in 0..nx {
            let mut min_x = region.min_x + col as f64 * size;
            let mut max_x = if col + 1 == nx {
                region.max_x
            } else {
                (min_x + size).min(region.max_x)
            };
            if col > 0 {
                min_x -= overlap;
            }
            if col + 1 < nx {
                max_x += overlap;
            }

            let bounds = BoundingBox::new(
                min_x.max(region.min_x),
                min_y.max(region.min_y),
                max_x.min(region.max_x),
                max_y.min(region.max_y),
            )?;
            tiles.push(Tile {
                index: tiles.len(),
                row,
                col,
                bounds,
            });
        }
    }

    Ok(tiles)
}
