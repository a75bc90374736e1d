//! Temporal median composites
//!
//! Reduces a stack of co-registered scenes to one image by taking the
//! per-pixel, per-band median across the time axis, skipping no-data.
//! The median is what makes a season's worth of partly-cloudy scenes
//! usable: transient cloud and glint pixels fall outside the middle of
//! the distribution.

use ndarray::Array2;
use rayon::prelude::*;

use benthos_core::raster::Raster;
use benthos_core::{Error, MultibandImage, Result};

/// Reduce a scene stack to a single multiband image by the pixel-wise
/// median over time.
///
/// Bands are matched by name against the first scene; scenes must be
/// co-registered (same shape). A pixel is no-data in the output only if
/// it is no-data in every scene.
///
/// Errors on an empty stack; the caller decides what an empty
/// collection means (the pipeline maps it to `EmptyCollection`).
pub fn median_composite(scenes: &[MultibandImage]) -> Result<MultibandImage> {
    let first = scenes
        .first()
        .ok_or_else(|| Error::Algorithm("median of an empty scene stack".to_string()))?;

    let shape = first.shape();
    for scene in scenes {
        if scene.shape() != shape {
            return Err(Error::SizeMismatch {
                er: shape.0,
                ec: shape.1,
                ar: scene.shape().0,
                ac: scene.shape().1,
            });
        }
    }

    let mut out = MultibandImage::new();
    for name in first.band_names() {
        let bands: Vec<&Raster<f64>> = scenes
            .iter()
            .map(|s| s.band(name))
            .collect::<Result<_>>()?;
        out.push_band(name, median_band(&bands)?)?;
    }
    Ok(out)
}

fn median_band(stack: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let template = stack[0];
    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values: Vec<f64> = Vec::with_capacity(stack.len());

            for (col, out) in row_data.iter_mut().enumerate() {
                values.clear();
                for band in stack {
                    let v = unsafe { band.get_unchecked(row, col) };
                    if !band.is_nodata(v) {
                        values.push(v);
                    }
                }
                if values.is_empty() {
                    continue;
                }

                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = values.len() / 2;
                *out = if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                };
            }
            row_data
        })
        .collect();

    let mut output = template.with_same_meta::<f64>();
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(values: Vec<f64>) -> MultibandImage {
        let mut b = Raster::from_vec(values, 2, 2).unwrap();
        b.set_nodata(Some(f64::NAN));
        MultibandImage::from_bands(vec![("B3".to_string(), b)]).unwrap()
    }

    #[test]
    fn test_median_odd_stack() {
        let scenes = vec![
            scene(vec![1.0, 10.0, 5.0, 0.0]),
            scene(vec![2.0, 20.0, 5.0, 0.0]),
            scene(vec![9.0, 30.0, 5.0, 1.0]),
        ];
        let composite = median_composite(&scenes).unwrap();
        let band = composite.band("B3").unwrap();

        assert_eq!(band.get(0, 0).unwrap(), 2.0);
        assert_eq!(band.get(0, 1).unwrap(), 20.0);
        assert_eq!(band.get(1, 0).unwrap(), 5.0);
        assert_eq!(band.get(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_median_even_stack_interpolates() {
        let scenes = vec![scene(vec![1.0; 4]), scene(vec![3.0; 4])];
        let composite = median_composite(&scenes).unwrap();
        assert_eq!(composite.band("B3").unwrap().get(0, 0).unwrap(), 2.0);
    }

    #[test]
    fn test_median_skips_nodata() {
        let scenes = vec![
            scene(vec![f64::NAN, 1.0, f64::NAN, 2.0]),
            scene(vec![4.0, f64::NAN, f64::NAN, 4.0]),
            scene(vec![6.0, 3.0, f64::NAN, 6.0]),
        ];
        let composite = median_composite(&scenes).unwrap();
        let band = composite.band("B3").unwrap();

        assert_eq!(band.get(0, 0).unwrap(), 5.0); // median of {4, 6}
        assert_eq!(band.get(0, 1).unwrap(), 2.0); // median of {1, 3}
        assert!(band.get(1, 0).unwrap().is_nan()); // nodata everywhere
        assert_eq!(band.get(1, 1).unwrap(), 4.0);
    }

    #[test]
    fn test_empty_stack_errors() {
        assert!(median_composite(&[]).is_err());
    }

    #[test]
    fn test_shape_mismatch_errors() {
        let a = scene(vec![1.0; 4]);
        let mut b3 = Raster::from_vec(vec![1.0; 6], 2, 3).unwrap();
        b3.set_nodata(Some(f64::NAN));
        let b = MultibandImage::from_bands(vec![("B3".to_string(), b3)]).unwrap();
        assert!(median_composite(&[a, b]).is_err());
    }
}
