//! Water-level scenario and flood threshold arithmetic
//!
//! Tide, surge and sea-level rise are given relative to the hydrographic
//! zero (ZH). The elevation grid uses a land datum, so the combined water
//! level is shifted by the datum offset before it is compared with terrain.

use serde::{Deserialize, Serialize};
use coastflood_core::{Error, Result};

/// Offset between hydrographic zero and the Cascais 1938 land datum used by
/// the northern Portuguese coastal DEMs (Viana do Castelo to Aveiro).
pub const DEFAULT_DATUM_OFFSET: f64 = 2.00;

/// A combined water-level scenario, all values in meters.
///
/// Negative surge or sea-level rise are accepted; they describe
/// hypothetical set-down or retreat scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    tide_level: f64,
    surge_height: f64,
    sea_level_rise: f64,
    datum_offset: f64,
}

impl Scenario {
    pub fn new(tide_level: f64, surge_height: f64, sea_level_rise: f64, datum_offset: f64) -> Self {
        Self {
            tide_level,
            surge_height,
            sea_level_rise,
            datum_offset,
        }
    }

    /// Scenario with the default datum offset
    pub fn with_default_datum(tide_level: f64, surge_height: f64, sea_level_rise: f64) -> Self {
        Self::new(tide_level, surge_height, sea_level_rise, DEFAULT_DATUM_OFFSET)
    }

    pub fn tide_level(&self) -> f64 {
        self.tide_level
    }

    pub fn surge_height(&self) -> f64 {
        self.surge_height
    }

    pub fn sea_level_rise(&self) -> f64 {
        self.sea_level_rise
    }

    pub fn datum_offset(&self) -> f64 {
        self.datum_offset
    }

    /// Total water level in the hydrographic datum: tide + surge + SLR
    pub fn total_water_level(&self) -> f64 {
        self.tide_level + self.surge_height + self.sea_level_rise
    }

    /// Total water level converted to the elevation grid's datum
    pub fn flood_threshold(&self) -> f64 {
        self.total_water_level() - self.datum_offset
    }

    /// Reject NaN or infinite components
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("tide_level", self.tide_level),
            ("surge_height", self.surge_height),
            ("sea_level_rise", self.sea_level_rise),
            ("datum_offset", self.datum_offset),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidParameter {
                    name,
                    value: value.to_string(),
                    reason: "scenario components must be finite".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Scenario {
    /// Highest astronomical tide, 50-year surge and the 2100 SLR projection
    fn default() -> Self {
        Self::with_default_datum(3.8, 0.6, 1.13)
    }
}
