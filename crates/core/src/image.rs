//! Multiband image container

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// A named set of co-registered bands over the same grid.
///
/// Every band shares one shape and transform; each cell carries either
/// a reflectance/index value or NaN (no-data). Operations never mutate
/// an image in place; they build new ones.
#[derive(Debug, Clone)]
pub struct MultibandImage {
    bands: Vec<(String, Raster<f64>)>,
}

impl MultibandImage {
    /// Create an empty image (bands are added one at a time).
    pub fn new() -> Self {
        Self { bands: Vec::new() }
    }

    /// Create an image from named bands, validating co-registration.
    pub fn from_bands(bands: Vec<(String, Raster<f64>)>) -> Result<Self> {
        let mut image = Self::new();
        for (name, band) in bands {
            image.push_band(name, band)?;
        }
        Ok(image)
    }

    /// Append a band, validating shape and transform against the bands
    /// already present.
    pub fn push_band(&mut self, name: impl Into<String>, band: Raster<f64>) -> Result<()> {
        if let Some((_, first)) = self.bands.first() {
            if first.shape() != band.shape() {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
        }
        self.bands.push((name.into(), band));
        Ok(())
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Whether the image has no bands
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Band names in insertion order
    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
            .ok_or_else(|| Error::BandNotFound(name.to_string()))
    }

    /// Build a new image containing only the named bands, in the given
    /// order. Errors if any name is missing.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        let mut out = Self::new();
        for &name in names {
            let band = self.band(name)?;
            out.push_band(name, band.clone())?;
        }
        Ok(out)
    }

    /// Build a new image containing every band whose name starts with
    /// `prefix` (the original source's `select('B.*')` idiom).
    pub fn select_prefix(&self, prefix: &str) -> Self {
        let mut out = Self::new();
        for (name, band) in &self.bands {
            if name.starts_with(prefix) {
                // co-registration already validated on the source image
                out.bands.push((name.clone(), band.clone()));
            }
        }
        out
    }

    /// Grid shape `(rows, cols)`; `(0, 0)` for an empty image
    pub fn shape(&self) -> (usize, usize) {
        self.bands
            .first()
            .map(|(_, b)| b.shape())
            .unwrap_or((0, 0))
    }

    /// Shared geotransform of all bands
    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.first().map(|(_, b)| b.transform())
    }

    /// The feature vector at a pixel, in band order. `None` if any band
    /// is no-data there.
    pub fn feature_vector(&self, row: usize, col: usize) -> Option<Vec<f64>> {
        let mut features = Vec::with_capacity(self.bands.len());
        for (_, band) in &self.bands {
            let v = band.get(row, col).ok()?;
            if band.is_nodata(v) {
                return None;
            }
            features.push(v);
        }
        Some(features)
    }
}

impl Default for MultibandImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn rgb_image() -> MultibandImage {
        MultibandImage::from_bands(vec![
            ("B2".to_string(), band(4, 4, 0.1)),
            ("B3".to_string(), band(4, 4, 0.2)),
            ("B4".to_string(), band(4, 4, 0.3)),
            ("SCL".to_string(), band(4, 4, 6.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_band_lookup() {
        let img = rgb_image();
        assert_eq!(img.band_count(), 4);
        assert_eq!(img.band("B3").unwrap().get(0, 0).unwrap(), 0.2);
        assert!(img.band("B99").is_err());
    }

    #[test]
    fn test_select() {
        let img = rgb_image();
        let sel = img.select(&["B4", "B2"]).unwrap();
        assert_eq!(sel.band_names(), vec!["B4", "B2"]);
        assert!(img.select(&["B4", "missing"]).is_err());
    }

    #[test]
    fn test_select_prefix() {
        let img = rgb_image();
        let spectral = img.select_prefix("B");
        assert_eq!(spectral.band_names(), vec!["B2", "B3", "B4"]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut img = MultibandImage::new();
        img.push_band("B2", band(4, 4, 0.1)).unwrap();
        assert!(img.push_band("B3", band(3, 4, 0.2)).is_err());
    }

    #[test]
    fn test_feature_vector_nodata() {
        let mut img = rgb_image();
        let mut b = band(4, 4, 0.5);
        b.set(1, 1, f64::NAN).unwrap();
        img.push_band("B8", b).unwrap();

        assert_eq!(
            img.feature_vector(0, 0).unwrap(),
            vec![0.1, 0.2, 0.3, 6.0, 0.5]
        );
        assert!(img.feature_vector(1, 1).is_none());
    }
}
