//! Normalized-difference spectral indices
//!
//! The two indices the service relies on: NDWI (water detection) and
//! NDCI (chlorophyll / eutrophication indicator). Both are instances of
//! the generic normalized difference `(a - b) / (a + b)`.

use ndarray::Array2;
use rayon::prelude::*;

use benthos_core::raster::{Raster, RasterElement};
use benthos_core::{Error, MultibandImage, Result};

/// Compute the normalized difference between two named bands of an
/// image:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// The result is in [-1, 1]. A pixel is no-data (NaN) when either input
/// band is no-data there, or when the denominator is exactly zero.
/// Never ±inf, so nothing poisons downstream arithmetic.
///
/// Pure: identical inputs give bit-identical outputs across calls.
pub fn normalized_difference(
    image: &MultibandImage,
    band_a: &str,
    band_b: &str,
) -> Result<Raster<f64>> {
    let a = image.band(band_a)?;
    let b = image.band(band_b)?;

    let (rows, cols) = a.shape();
    let nodata_a = a.nodata();
    let nodata_b = b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };

                if va.is_nodata(nodata_a) || vb.is_nodata(nodata_b) {
                    continue;
                }

                let sum = va + vb;
                if sum == 0.0 {
                    continue;
                }

                row_data[col] = (va - vb) / sum;
            }
            row_data
        })
        .collect();

    let mut output = a.with_same_meta::<f64>();
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Normalized Difference Water Index (McFeeters)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water; the pipeline thresholds this
/// for legacy-generation water detection.
pub fn ndwi(image: &MultibandImage, green: &str, nir: &str) -> Result<Raster<f64>> {
    normalized_difference(image, green, nir)
}

/// Normalized Difference Chlorophyll Index
///
/// `NDCI = (RedEdge - Red) / (RedEdge + Red)`
///
/// A continuous proxy for chlorophyll concentration; no fixed threshold
/// is applied anywhere in the service.
pub fn ndci(image: &MultibandImage, red_edge: &str, red: &str) -> Result<Raster<f64>> {
    normalized_difference(image, red_edge, red)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_band_image(green: Vec<f64>, nir: Vec<f64>) -> MultibandImage {
        let mut g = Raster::from_vec(green, 2, 2).unwrap();
        g.set_nodata(Some(f64::NAN));
        let mut n = Raster::from_vec(nir, 2, 2).unwrap();
        n.set_nodata(Some(f64::NAN));
        MultibandImage::from_bands(vec![("B3".to_string(), g), ("B8".to_string(), n)]).unwrap()
    }

    #[test]
    fn test_ndwi_values() {
        let img = two_band_image(vec![0.3, 0.1, 0.2, 0.4], vec![0.1, 0.3, 0.2, 0.0]);
        let ndwi = ndwi(&img, "B3", "B8").unwrap();

        assert!((ndwi.get(0, 0).unwrap() - 0.5).abs() < 1e-12);
        assert!((ndwi.get(0, 1).unwrap() + 0.5).abs() < 1e-12);
        assert!(ndwi.get(1, 0).unwrap().abs() < 1e-12);
        assert!((ndwi.get(1, 1).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator_is_nodata() {
        // 0.2 + (-0.2) == 0 exactly
        let img = two_band_image(vec![0.2, 0.0, 1.0, 1.0], vec![-0.2, 0.0, 1.0, 1.0]);
        let nd = normalized_difference(&img, "B3", "B8").unwrap();

        assert!(nd.get(0, 0).unwrap().is_nan());
        assert!(nd.get(0, 1).unwrap().is_nan());
        assert!(nd.get(1, 0).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_nodata_propagates() {
        let img = two_band_image(vec![f64::NAN, 0.5, 0.5, 0.5], vec![0.1, f64::NAN, 0.1, 0.1]);
        let nd = normalized_difference(&img, "B3", "B8").unwrap();

        assert!(nd.get(0, 0).unwrap().is_nan());
        assert!(nd.get(0, 1).unwrap().is_nan());
        assert!(nd.get(1, 0).unwrap().is_finite());
    }

    #[test]
    fn test_deterministic_across_calls() {
        let img = two_band_image(vec![0.31, 0.17, 0.29, 0.44], vec![0.12, 0.33, 0.21, 0.05]);
        let first = normalized_difference(&img, "B3", "B8").unwrap();
        let second = normalized_difference(&img, "B3", "B8").unwrap();

        for r in 0..2 {
            for c in 0..2 {
                let a = first.get(r, c).unwrap();
                let b = second.get(r, c).unwrap();
                assert_eq!(a.to_bits(), b.to_bits());
            }
        }
    }

    #[test]
    fn test_missing_band_errors() {
        let img = two_band_image(vec![0.1; 4], vec![0.2; 4]);
        assert!(normalized_difference(&img, "B3", "B99").is_err());
    }
}
