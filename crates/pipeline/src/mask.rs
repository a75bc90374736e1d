//! Year-specific water masks.
//!
//! A mask combines three terms: depth inclusion from the bathymetry
//! raster, a generation-specific water test, and optional morphological
//! smoothing. Masks are always built per target window; the reference
//! year's mask is never reused for another year.

use tracing::warn;

use benthos_core::raster::Raster;
use benthos_core::{Mask, MultibandImage, RasterElement};

use benthos_algorithms::focal_mode::{focal_mode, radius_in_cells};
use benthos_algorithms::indices::ndwi;
use benthos_algorithms::mask_ops::{and, band_between, bits_clear, eq_code, gt};

use crate::error::Result;
use crate::sensor::{
    SensorGeneration, BAND_GREEN, BAND_NIR, BAND_QA, BAND_SCL, QA_CLOUD_BITS, SCL_WATER,
};

/// Parameters for one mask build.
#[derive(Debug, Clone, Copy)]
pub struct MaskParams {
    /// Depth inclusion ceiling in metres (`0 < depth < ceiling`).
    pub depth_ceiling_m: f64,
    /// NDWI threshold for legacy water detection.
    pub water_index_threshold: f64,
    /// Smoothing radius in metres; 0 disables smoothing.
    pub smoothing_radius_m: f64,
}

/// Build the inclusion mask for a composite.
///
/// `depth` is `None` when the bathymetry asset was unreachable; the
/// depth term then degrades to all-true. The caller is responsible for
/// surfacing that condition as a warning; this function only builds
/// what it is given.
///
/// Water detection branches on the sensor generation:
/// - **Harmonized**: the scene-classification band's water category,
///   taken directly.
/// - **Legacy**: no scene-classification product exists, so the
///   cloud-opacity bits of the quality band must be clear *and* the
///   NDWI must exceed the configured threshold.
pub fn build_mask(
    composite: &MultibandImage,
    depth: Option<&Raster<f64>>,
    generation: SensorGeneration,
    params: &MaskParams,
) -> Result<Mask> {
    let water = water_mask(composite, generation, params.water_index_threshold)?;

    let combined = match depth {
        Some(depth_raster) => {
            let depth_mask = band_between(depth_raster, 0.0, params.depth_ceiling_m);
            and(&depth_mask, &water)?
        }
        None => water,
    };

    let cell_m = composite
        .transform()
        .map(|t| t.cell_size_m())
        .unwrap_or(0.0);
    let radius = radius_in_cells(cell_m, params.smoothing_radius_m);
    Ok(focal_mode(&combined, radius)?)
}

fn water_mask(
    composite: &MultibandImage,
    generation: SensorGeneration,
    ndwi_threshold: f64,
) -> Result<Mask> {
    match generation {
        SensorGeneration::Harmonized => {
            let scl = composite.band(BAND_SCL)?;
            Ok(eq_code(&to_code_band(scl), SCL_WATER))
        }
        SensorGeneration::Legacy => {
            let qa = composite.band(BAND_QA)?;
            let clear = bits_clear(&to_bitmask_band(qa), QA_CLOUD_BITS);

            let index = ndwi(composite, BAND_GREEN, BAND_NIR)?;
            let water = gt(&index, ndwi_threshold);
            Ok(and(&clear, &water)?)
        }
    }
}

/// Quantize a float categorical band to u8 codes; no-data becomes a
/// code that matches nothing.
fn to_code_band(band: &Raster<f64>) -> Raster<u8> {
    let nodata = band.nodata();
    band.map(move |v| {
        if v.is_nodata(nodata) || !(0.0..=254.0).contains(&v) {
            u8::MAX
        } else {
            v.round() as u8
        }
    })
}

/// Quantize a float quality band to u16 bit patterns; no-data becomes
/// all-bits-set so every bit test excludes the pixel.
fn to_bitmask_band(band: &Raster<f64>) -> Raster<u16> {
    let nodata = band.nodata();
    band.map(move |v| {
        if v.is_nodata(nodata) || !(0.0..=65534.0).contains(&v) {
            u16::MAX
        } else {
            v.round() as u16
        }
    })
}

/// Depth fetch failures are reported with this helper so the log line
/// and the warning text stay consistent.
pub fn log_bathymetry_fallback(asset: &str, reason: &str) {
    warn!(asset, reason, "bathymetry unavailable; depth term degraded to all-true");
}

#[cfg(test)]
mod tests {
    use super::*;
    use benthos_core::raster::GeoTransform;
    use benthos_core::Region;

    fn harmonized_composite(scl_codes: Vec<f64>) -> MultibandImage {
        let region = Region::new(0.0, 0.0, 0.001, 0.001).unwrap();
        let (gt, _, _) = GeoTransform::for_region(&region, 10.0);

        let make = |values: Vec<f64>| {
            let mut r = Raster::from_vec(values, 2, 2).unwrap();
            r.set_nodata(Some(f64::NAN));
            r.set_transform(gt);
            r
        };
        MultibandImage::from_bands(vec![
            ("B3".to_string(), make(vec![0.3; 4])),
            ("B8".to_string(), make(vec![0.1; 4])),
            ("SCL".to_string(), make(scl_codes)),
        ])
        .unwrap()
    }

    fn legacy_composite(green: Vec<f64>, nir: Vec<f64>, qa: Vec<f64>) -> MultibandImage {
        let make = |values: Vec<f64>| {
            let mut r = Raster::from_vec(values, 2, 2).unwrap();
            r.set_nodata(Some(f64::NAN));
            r
        };
        MultibandImage::from_bands(vec![
            ("B3".to_string(), make(green)),
            ("B8".to_string(), make(nir)),
            ("QA60".to_string(), make(qa)),
        ])
        .unwrap()
    }

    fn depth_raster(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn params() -> MaskParams {
        MaskParams {
            depth_ceiling_m: 20.0,
            water_index_threshold: 0.1,
            smoothing_radius_m: 0.0,
        }
    }

    #[test]
    fn test_harmonized_uses_scene_classification() {
        let composite = harmonized_composite(vec![6.0, 4.0, 6.0, f64::NAN]);
        let depth = depth_raster(vec![5.0; 4]);

        let mask = build_mask(&composite, Some(&depth), SensorGeneration::Harmonized, &params())
            .unwrap();

        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(0, 1).unwrap(), 0); // vegetation code
        assert_eq!(mask.get(1, 0).unwrap(), 1);
        assert_eq!(mask.get(1, 1).unwrap(), 0); // nodata code
    }

    #[test]
    fn test_legacy_combines_qa_and_ndwi() {
        let cloud = (1 << 10) as f64;
        // pixel 0: water, clear; pixel 1: water but cloudy;
        // pixel 2: land, clear; pixel 3: water, clear
        let composite = legacy_composite(
            vec![0.3, 0.3, 0.1, 0.3],
            vec![0.1, 0.1, 0.3, 0.1],
            vec![0.0, cloud, 0.0, 0.0],
        );
        let depth = depth_raster(vec![5.0; 4]);

        let mask =
            build_mask(&composite, Some(&depth), SensorGeneration::Legacy, &params()).unwrap();

        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(0, 1).unwrap(), 0);
        assert_eq!(mask.get(1, 0).unwrap(), 0);
        assert_eq!(mask.get(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_depth_window_excludes() {
        let composite = harmonized_composite(vec![6.0; 4]);
        // 0 (dry), in-range, at ceiling, beyond ceiling
        let depth = depth_raster(vec![0.0, 10.0, 20.0, 35.0]);

        let mask = build_mask(&composite, Some(&depth), SensorGeneration::Harmonized, &params())
            .unwrap();

        assert_eq!(mask.get(0, 0).unwrap(), 0);
        assert_eq!(mask.get(0, 1).unwrap(), 1);
        assert_eq!(mask.get(1, 0).unwrap(), 0);
        assert_eq!(mask.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_zero_depth_ceiling_masks_everything() {
        let composite = harmonized_composite(vec![6.0; 4]);
        let depth = depth_raster(vec![0.0, 10.0, 20.0, 35.0]);
        let p = MaskParams {
            depth_ceiling_m: 0.0,
            ..params()
        };

        let mask =
            build_mask(&composite, Some(&depth), SensorGeneration::Harmonized, &p).unwrap();
        assert_eq!(mask.count_where(|v| v != 0), 0);
    }

    #[test]
    fn test_missing_depth_degrades_to_water_only() {
        let composite = harmonized_composite(vec![6.0, 4.0, 6.0, 6.0]);

        let mask =
            build_mask(&composite, None, SensorGeneration::Harmonized, &params()).unwrap();

        // water pixels survive without any depth constraint
        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(0, 1).unwrap(), 0);
        assert_eq!(mask.get(1, 1).unwrap(), 1);
    }
}
