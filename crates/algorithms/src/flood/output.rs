//! Flood mask encoding for persistence

use ndarray::Array2;
use coastflood_core::raster::Raster;
use coastflood_core::{Error, Result};

/// Cell value for flooded cells
pub const FLOODED: u8 = 1;
/// Cell value for dry cells
pub const DRY: u8 = 0;
/// Cell value for cells without elevation data
pub const MASK_NODATA: u8 = 255;

/// Encode a 0/1 flood mask as 1 = flooded, 0 = dry, 255 = no-data.
///
/// `masked` marks cells that were sanitized away; they are written as
/// no-data regardless of their flood state. The result declares 255 as its
/// no-data value.
pub fn flood_mask_to_raster(mask: &Raster<u8>, masked: &Array2<bool>) -> Result<Raster<u8>> {
    let (rows, cols) = mask.shape();
    if masked.dim() != (rows, cols) {
        let (ar, ac) = masked.dim();
        return Err(Error::SizeMismatch { er: rows, ec: cols, ar, ac });
    }

    let mut out = mask.with_same_meta::<u8>(rows, cols);
    out.set_nodata(Some(MASK_NODATA));
    ndarray::Zip::from(out.data_mut())
        .and(mask.data())
        .and(masked)
        .for_each(|o, &m, &nd| {
            *o = if nd {
                MASK_NODATA
            } else if m == FLOODED {
                FLOODED
            } else {
                DRY
            };
        });
    Ok(out)
}
