//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Elevation grids are read as `f64`; flood masks are written as `u8`.
/// Other widths exist so that any single-band GeoTIFF can be decoded.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, `None` when the value does not fit
    fn from_f64(value: f64) -> Option<Self> {
        NumCast::from(value)
    }

    /// Parse a GDAL_NODATA string ("-9999", "nan", "255")
    fn parse_nodata(text: &str) -> Option<Self> {
        let text = text.trim().trim_end_matches('\0');
        let value: f64 = if text.eq_ignore_ascii_case("nan") {
            f64::NAN
        } else {
            text.parse().ok()?
        };
        Self::from_f64(value)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    };
}

impl_raster_element_int!(i8);
impl_raster_element_int!(i16);
impl_raster_element_int!(i32);
impl_raster_element_int!(u8);
impl_raster_element_int!(u16);
impl_raster_element_int!(u32);
impl_raster_element_float!(f32);
impl_raster_element_float!(f64);
