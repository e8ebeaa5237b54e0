//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG code of WGS84 geographic coordinates
pub const EPSG_WGS84: u32 = 4326;

/// EPSG codes reserved for geographic 2D coordinate systems (ETRS89 is 4258)
const EPSG_GEOGRAPHIC_2D: std::ops::RangeInclusive<u32> = 4000..=4999;

/// Coordinate Reference System representation.
///
/// The flood engine never reprojects; it only carries the identifier from the
/// input grid to the output raster and uses it to decide whether pixel sizes
/// are in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// Model type declared by the source file (GeoTIFF GTModelTypeGeoKey)
    #[serde(default)]
    geographic: Option<bool>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            geographic: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            geographic: None,
        }
    }

    /// A user-defined CRS known only by its model type
    pub fn user_defined(geographic: bool) -> Self {
        Self {
            wkt: None,
            epsg: None,
            geographic: Some(geographic),
        }
    }

    /// Record the model type declared alongside the identifier
    pub fn with_model_type(mut self, geographic: bool) -> Self {
        self.geographic = Some(geographic);
        self
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(EPSG_WGS84)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        if let Some(geographic) = self.geographic {
            return geographic;
        }
        if let Some(code) = self.epsg {
            return EPSG_GEOGRAPHIC_2D.contains(&code);
        }
        self.wkt
            .as_deref()
            .map_or(false, |w| w.trim_start().starts_with("GEOGCS") || w.trim_start().starts_with("GEOGCRS"))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
        assert!(crs.is_geographic());
    }

    #[test]
    fn test_projected_is_not_geographic() {
        // PT-TM06/ETRS89, the native grid of Portuguese coastal DEMs
        assert!(!CRS::from_epsg(3763).is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\"]").is_geographic());
    }

    #[test]
    fn test_other_geographic_datums() {
        // ETRS89
        assert!(CRS::from_epsg(4258).is_geographic());
        assert!(CRS::from_epsg(4269).is_geographic());
        assert!(!CRS::from_epsg(32629).is_geographic());
    }

    #[test]
    fn test_declared_model_type_wins() {
        assert!(CRS::user_defined(true).is_geographic());
        assert!(!CRS::user_defined(false).is_geographic());
        assert!(CRS::from_epsg(9999).with_model_type(true).is_geographic());
        assert_eq!(CRS::user_defined(true).identifier(), "Unknown");
    }
}
