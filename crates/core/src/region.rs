//! Geographic region of interest

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An axis-aligned lon/lat bounding box.
///
/// Immutable once constructed; the constructor enforces `min < max` on
/// both axes. Serialized as the conventional `[west, south, east, north]`
/// order when talking to the scene catalog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Region {
    /// Create a region, validating the bounding box invariant.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        if !(min_lon < max_lon) || !(min_lat < max_lat) {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("[{min_lon}, {min_lat}, {max_lon}, {max_lat}]"),
                reason: "bounding box requires min < max on both axes".to_string(),
            });
        }
        if !(-180.0..=180.0).contains(&min_lon)
            || !(-180.0..=180.0).contains(&max_lon)
            || !(-90.0..=90.0).contains(&min_lat)
            || !(-90.0..=90.0).contains(&max_lat)
        {
            return Err(Error::InvalidParameter {
                name: "region",
                value: format!("[{min_lon}, {min_lat}, {max_lon}, {max_lat}]"),
                reason: "coordinates outside lon/lat range".to_string(),
            });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Bounding box as `[west, south, east, north]` for catalog queries.
    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Width in degrees of longitude
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// A stable hashable key for cache lookups (bit patterns of the four
    /// corners). Two regions compare equal iff their keys are equal.
    pub fn cache_key(&self) -> [u64; 4] {
        [
            self.min_lon.to_bits(),
            self.min_lat.to_bits(),
            self.max_lon.to_bits(),
            self.max_lat.to_bits(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_region() {
        let r = Region::new(119.2741, 23.1694, 119.8114, 23.8792).unwrap();
        assert!(r.width() > 0.0);
        assert!(r.height() > 0.0);
        assert_eq!(r.to_bbox(), [119.2741, 23.1694, 119.8114, 23.8792]);
    }

    #[test]
    fn test_degenerate_region_rejected() {
        assert!(Region::new(119.8, 23.1, 119.2, 23.8).is_err());
        assert!(Region::new(119.2, 23.8, 119.8, 23.1).is_err());
        assert!(Region::new(119.2, 23.1, 119.2, 23.8).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Region::new(-190.0, 23.1, 119.8, 23.8).is_err());
        assert!(Region::new(119.2, -95.0, 119.8, 23.8).is_err());
    }

    #[test]
    fn test_cache_key_distinguishes_regions() {
        let a = Region::new(119.2, 23.1, 119.8, 23.8).unwrap();
        let b = Region::new(119.2, 23.1, 119.8, 23.9).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), a.cache_key());
    }
}
