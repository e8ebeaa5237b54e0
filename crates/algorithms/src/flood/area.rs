//! Flooded area statistics
//!
//! Geographic grids are converted with a spherical approximation evaluated
//! at one reference latitude (the tile's midpoint):
//!
//! ```text
//! m/deg latitude  = 111320
//! m/deg longitude = 111320 * cos(latitude)
//! ```

use coastflood_core::raster::Raster;
use serde::{Deserialize, Serialize};

/// Meters per degree of latitude, and of longitude at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Physical extent of a flood mask
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaStatistics {
    pub flooded_pixel_count: usize,
    pub pixel_area_m2: f64,
    pub flooded_area_m2: f64,
    pub flooded_area_km2: f64,
    pub pixel_width_m: f64,
    pub pixel_height_m: f64,
    /// Reference latitude used for the conversion; `None` for projected grids
    pub center_latitude: Option<f64>,
}

impl AreaStatistics {
    /// Statistics for `flooded` pixels of `pixel_width_m` x `pixel_height_m`
    pub fn from_meters(flooded: usize, pixel_width_m: f64, pixel_height_m: f64) -> Self {
        let pixel_area_m2 = pixel_width_m * pixel_height_m;
        let flooded_area_m2 = flooded as f64 * pixel_area_m2;
        Self {
            flooded_pixel_count: flooded,
            pixel_area_m2,
            flooded_area_m2,
            flooded_area_km2: flooded_area_m2 / 1_000_000.0,
            pixel_width_m,
            pixel_height_m,
            center_latitude: None,
        }
    }

    /// Statistics for pixels sized in degrees, converted at `latitude`
    pub fn from_degrees(flooded: usize, pixel_size_deg: (f64, f64), latitude: f64) -> Self {
        let (width_m, height_m) = degrees_to_meters(pixel_size_deg, latitude);
        Self {
            center_latitude: Some(latitude),
            ..Self::from_meters(flooded, width_m, height_m)
        }
    }
}

/// Meters per degree of longitude at `latitude` (degrees)
pub fn meters_per_degree_lon(latitude: f64) -> f64 {
    METERS_PER_DEGREE * latitude.to_radians().cos()
}

/// Convert a (width, height) pixel size in degrees to meters
pub fn degrees_to_meters(pixel_size_deg: (f64, f64), latitude: f64) -> (f64, f64) {
    (
        pixel_size_deg.0.abs() * meters_per_degree_lon(latitude),
        pixel_size_deg.1.abs() * METERS_PER_DEGREE,
    )
}

/// Count cells equal to 1 in a 0/1 flood mask
pub fn count_flooded(mask: &Raster<u8>) -> usize {
    mask.data().iter().filter(|&&v| v == 1).count()
}

/// Area statistics for a mask on a geographic grid
pub fn area_statistics(mask: &Raster<u8>, latitude: f64) -> AreaStatistics {
    AreaStatistics::from_degrees(count_flooded(mask), mask.transform().pixel_size(), latitude)
}

/// Area statistics for a mask on a projected grid with meter units
pub fn area_statistics_projected(mask: &Raster<u8>) -> AreaStatistics {
    let (w, h) = mask.transform().pixel_size();
    AreaStatistics::from_meters(count_flooded(mask), w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use coastflood_core::GeoTransform;

    #[test]
    fn test_longitude_scale_at_41n() {
        assert_relative_eq!(meters_per_degree_lon(41.0), 84_014.27, epsilon = 0.01);
        assert_relative_eq!(meters_per_degree_lon(0.0), METERS_PER_DEGREE);
    }

    #[test]
    fn test_ten_thousandth_degree_pixel() {
        let stats = AreaStatistics::from_degrees(1, (0.0001, 0.0001), 41.0);
        assert_relative_eq!(stats.pixel_width_m, 8.40, epsilon = 0.01);
        assert_relative_eq!(stats.pixel_height_m, 11.132, epsilon = 1e-9);
        assert_relative_eq!(stats.pixel_area_m2, 93.5, epsilon = 0.1);
        assert_eq!(stats.center_latitude, Some(41.0));
    }

    #[test]
    fn test_totals_scale_with_count() {
        let stats = AreaStatistics::from_meters(2_000, 25.0, 20.0);
        assert_relative_eq!(stats.pixel_area_m2, 500.0);
        assert_relative_eq!(stats.flooded_area_m2, 1_000_000.0);
        assert_relative_eq!(stats.flooded_area_km2, 1.0);
    }

    #[test]
    fn test_empty_mask_is_zero() {
        let mask: Raster<u8> = Raster::new(0, 0);
        let stats = area_statistics(&mask, 41.0);
        assert_eq!(stats.flooded_pixel_count, 0);
        assert_eq!(stats.flooded_area_m2, 0.0);
    }

    #[test]
    fn test_mask_counts_only_ones() {
        let mut mask = Raster::from_vec(vec![1u8, 0, 255, 1], 2, 2).unwrap();
        mask.set_transform(GeoTransform::new(500_000.0, 4_500_000.0, 10.0, -10.0));
        let stats = area_statistics_projected(&mask);
        assert_eq!(stats.flooded_pixel_count, 2);
        assert_relative_eq!(stats.flooded_area_m2, 200.0);
        assert_eq!(stats.center_latitude, None);
    }
}
