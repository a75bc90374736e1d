//! Boolean raster algebra for inclusion masks
//!
//! A [`Mask`] is a `Raster<u8>` where 1 means the pixel participates in
//! downstream computation. Every operation here is element-wise and
//! pure; no-data inputs always exclude the pixel (0), so masks compose
//! conservatively under [`and`].

use benthos_core::raster::Raster;
use benthos_core::{Mask, RasterElement, Result};

/// `value > threshold` test on a float band. No-data compares false.
pub fn gt(band: &Raster<f64>, threshold: f64) -> Mask {
    let nodata = band.nodata();
    let mut mask = band.map(|v| (!v.is_nodata(nodata) && v > threshold) as u8);
    mask.set_nodata(None);
    mask
}

/// `value < threshold` test on a float band. No-data compares false.
pub fn lt(band: &Raster<f64>, threshold: f64) -> Mask {
    let nodata = band.nodata();
    let mut mask = band.map(|v| (!v.is_nodata(nodata) && v < threshold) as u8);
    mask.set_nodata(None);
    mask
}

/// Open-interval test `lo < value < hi` on a float band.
///
/// The depth inclusion rule `0 < depth < ceiling` uses this; with
/// `hi == lo` (e.g. a zero depth ceiling) no pixel can pass.
pub fn band_between(band: &Raster<f64>, lo: f64, hi: f64) -> Mask {
    let nodata = band.nodata();
    let mut mask = band.map(|v| (!v.is_nodata(nodata) && v > lo && v < hi) as u8);
    mask.set_nodata(None);
    mask
}

/// Categorical code equality test on an integer band (e.g. the
/// scene-classification band's water category).
pub fn eq_code(band: &Raster<u8>, code: u8) -> Mask {
    let nodata = band.nodata();
    let mut mask = band.map(|v| (!v.is_nodata(nodata) && v == code) as u8);
    mask.set_nodata(None);
    mask
}

/// Bitmask test on a quality band: true where every bit in `bits` is
/// zero (e.g. cloud-opacity and cirrus bits of the legacy QA band).
pub fn bits_clear(band: &Raster<u16>, bits: u16) -> Mask {
    let nodata = band.nodata();
    let mut mask = band.map(|v| (!v.is_nodata(nodata) && v & bits == 0) as u8);
    mask.set_nodata(None);
    mask
}

/// Logical AND of two masks.
pub fn and(a: &Mask, b: &Mask) -> Result<Mask> {
    a.zip_map(b, |x, y| (x != 0 && y != 0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_band(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn test_gt_with_nodata() {
        let band = float_band(vec![0.2, 0.05, f64::NAN, 0.1]);
        let mask = gt(&band, 0.1);

        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(0, 1).unwrap(), 0);
        assert_eq!(mask.get(1, 0).unwrap(), 0);
        // strictly greater: 0.1 > 0.1 is false
        assert_eq!(mask.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_band_between_open_interval() {
        let depth = float_band(vec![0.0, 5.0, 20.0, 19.99]);
        let mask = band_between(&depth, 0.0, 20.0);

        assert_eq!(mask.get(0, 0).unwrap(), 0); // 0 excluded
        assert_eq!(mask.get(0, 1).unwrap(), 1);
        assert_eq!(mask.get(1, 0).unwrap(), 0); // ceiling excluded
        assert_eq!(mask.get(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_band_between_zero_ceiling_is_all_false() {
        let depth = float_band(vec![0.0, 5.0, 20.0, 0.001]);
        let mask = band_between(&depth, 0.0, 0.0);
        assert_eq!(mask.count_where(|v| v != 0), 0);
    }

    #[test]
    fn test_eq_code() {
        let scl = Raster::from_vec(vec![6u8, 4, 6, 0], 2, 2).unwrap();
        let water = eq_code(&scl, 6);

        assert_eq!(water.get(0, 0).unwrap(), 1);
        assert_eq!(water.get(0, 1).unwrap(), 0);
        assert_eq!(water.get(1, 0).unwrap(), 1);
    }

    #[test]
    fn test_bits_clear() {
        // bits 10 and 11
        let qa = Raster::from_vec(vec![0u16, 1 << 10, 1 << 11, (1 << 10) | 1], 2, 2).unwrap();
        let clear = bits_clear(&qa, (1 << 10) | (1 << 11));

        assert_eq!(clear.get(0, 0).unwrap(), 1);
        assert_eq!(clear.get(0, 1).unwrap(), 0);
        assert_eq!(clear.get(1, 0).unwrap(), 0);
        assert_eq!(clear.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_and_composition() {
        let a = Raster::from_vec(vec![1u8, 1, 0, 0], 2, 2).unwrap();
        let b = Raster::from_vec(vec![1u8, 0, 1, 0], 2, 2).unwrap();
        let c = and(&a, &b).unwrap();

        assert_eq!(c.get(0, 0).unwrap(), 1);
        assert_eq!(c.get(0, 1).unwrap(), 0);
        assert_eq!(c.get(1, 0).unwrap(), 0);
        assert_eq!(c.get(1, 1).unwrap(), 0);
    }
}
