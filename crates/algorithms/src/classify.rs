//! Applying a trained forest to an image
//!
//! The per-pixel half of the train/apply split: every mask-true pixel
//! of the target composite gets a class vote; everything else stays 0.

use ndarray::Array2;
use rayon::prelude::*;

use benthos_core::raster::Raster;
use benthos_core::{Error, Mask, MultibandImage, Result};

use crate::forest::RandomForest;

/// Classify every masked pixel of `image` with `model`.
///
/// - Pixels where `mask` is 0 stay 0 (unclassified), whatever the model
///   would have said: masks are year-specific and the model never sees
///   pixels outside the target year's own mask.
/// - Pixels with incomplete feature vectors (any band no-data) stay 0.
/// - The model is read-only; two runs over different years share it
///   without interference.
///
/// The image's bands must match the training feature layout.
pub fn classify_image(
    model: &RandomForest,
    image: &MultibandImage,
    mask: &Mask,
) -> Result<Raster<u8>> {
    let shape = image.shape();
    if mask.shape() != shape {
        return Err(Error::SizeMismatch {
            er: shape.0,
            ec: shape.1,
            ar: mask.rows(),
            ac: mask.cols(),
        });
    }
    if image.band_count() != model.n_features() {
        return Err(Error::InvalidParameter {
            name: "feature_bands",
            value: format!("{}", image.band_count()),
            reason: format!("model was trained on {} bands", model.n_features()),
        });
    }

    let (rows, cols) = shape;

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let included = unsafe { mask.get_unchecked(row, col) } != 0;
                if !included {
                    continue;
                }
                if let Some(features) = image.feature_vector(row, col) {
                    *out = model.predict(&features);
                }
            }
            row_data
        })
        .collect();

    let template = mask;
    let mut output = template.with_same_meta::<u8>();
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
