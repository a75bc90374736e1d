//! Stratified training-point sampling
//!
//! Draws (feature-vector, label) pairs from a composite image and its
//! remapped label raster, restricted to the water mask. The draw is
//! stratified: each habitat class present under the mask contributes
//! points in proportion to its pixel frequency, bounded by the total
//! point budget and by per-class availability.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use benthos_core::raster::Raster;
use benthos_core::{ClassLabel, Error, Mask, MultibandImage, Result};

/// Parameters for [`stratified_sample`].
#[derive(Debug, Clone)]
pub struct SamplingParams {
    /// Target total number of points across all classes
    pub n_points: usize,
    /// Rows per scan tile. A memory/performance knob only: the drawn
    /// set is identical for every tile size (candidate lists are sorted
    /// by pixel index before the seeded draw).
    pub tile_rows: usize,
    /// Seed for the point draw; same seed, same sample
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            n_points: 1000,
            tile_rows: 256,
            seed: 7,
        }
    }
}

/// A stratified set of (feature-vector, label) pairs.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    /// Band names, in feature order
    pub feature_names: Vec<String>,
    /// One feature vector per drawn point
    pub features: Vec<Vec<f64>>,
    /// Class label per drawn point (never 0)
    pub labels: Vec<ClassLabel>,
}

impl TrainingSample {
    /// Number of drawn points
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the sample is empty (no eligible pixels at all)
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct classes present, ascending
    pub fn classes_present(&self) -> Vec<ClassLabel> {
        let mut seen = [false; 256];
        for &l in &self.labels {
            seen[l as usize] = true;
        }
        (0..=255u8).filter(|&c| seen[c as usize]).collect()
    }

    /// Points per class (index = class label)
    pub fn class_counts(&self) -> [usize; 256] {
        let mut counts = [0usize; 256];
        for &l in &self.labels {
            counts[l as usize] += 1;
        }
        counts
    }
}

/// Draw a stratified random sample from `image` where `mask` is true
/// and `labels` carries a habitat class (non-zero).
///
/// Per-class point counts are proportional to class frequency under the
/// mask. A class with fewer eligible pixels than its share is capped at
/// its available count, never raised and never padded with duplicates. A
/// class absent under the mask contributes zero points; reporting such
/// drops against the nominal legend is the caller's concern.
pub fn stratified_sample(
    image: &MultibandImage,
    mask: &Mask,
    labels: &Raster<u8>,
    params: &SamplingParams,
) -> Result<TrainingSample> {
    let shape = image.shape();
    if mask.shape() != shape || labels.shape() != shape {
        return Err(Error::SizeMismatch {
            er: shape.0,
            ec: shape.1,
            ar: mask.rows(),
            ac: mask.cols(),
        });
    }
    if params.n_points == 0 {
        return Err(Error::InvalidParameter {
            name: "n_points",
            value: "0".to_string(),
            reason: "point budget must be positive".to_string(),
        });
    }

    let (rows, cols) = shape;
    let tile_rows = params.tile_rows.max(1);

    // Collect eligible pixel indices per class, scanning tile by tile.
    let mut candidates: Vec<Vec<usize>> = vec![Vec::new(); 256];
    let mut row0 = 0;
    while row0 < rows {
        let row1 = (row0 + tile_rows).min(rows);
        for row in row0..row1 {
            for col in 0..cols {
                let included = unsafe { mask.get_unchecked(row, col) } != 0;
                if !included {
                    continue;
                }
                let class = unsafe { labels.get_unchecked(row, col) };
                if class == 0 {
                    continue;
                }
                if image.feature_vector(row, col).is_none() {
                    continue;
                }
                candidates[class as usize].push(row * cols + col);
            }
        }
        row0 = row1;
    }

    // Tile order must not influence the draw.
    for list in candidates.iter_mut() {
        list.sort_unstable();
    }

    let total_eligible: usize = candidates.iter().map(|c| c.len()).sum();
    let feature_names: Vec<String> = image.band_names().iter().map(|s| s.to_string()).collect();

    if total_eligible == 0 {
        return Ok(TrainingSample {
            feature_names,
            features: Vec::new(),
            labels: Vec::new(),
        });
    }

    let budget = params.n_points.min(total_eligible);
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    let mut features: Vec<Vec<f64>> = Vec::with_capacity(budget);
    let mut out_labels: Vec<ClassLabel> = Vec::with_capacity(budget);

    for class in 1..=255usize {
        let list = &candidates[class];
        if list.is_empty() {
            continue;
        }
        // proportional share, at least one point for any present class
        let share = (budget as f64 * list.len() as f64 / total_eligible as f64).round() as usize;
        let take = share.clamp(1, list.len());

        let mut drawn: Vec<usize> = list.clone();
        drawn.shuffle(&mut rng);
        drawn.truncate(take);

        for idx in drawn {
            let (row, col) = (idx / cols, idx % cols);
            // eligibility was checked during the scan
            if let Some(fv) = image.feature_vector(row, col) {
                features.push(fv);
                out_labels.push(class as ClassLabel);
            }
        }
    }

    Ok(TrainingSample {
        feature_names,
        features,
        labels: out_labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 fixture: band "B1" encodes the class signature, labels
    /// split the masked area 3:1 between classes 1 and 2.
    fn fixture() -> (MultibandImage, Mask, Raster<u8>) {
        let rows = 20;
        let cols = 20;
        let mut band = Raster::filled(rows, cols, 0.0);
        band.set_nodata(Some(f64::NAN));
        let mut labels: Raster<u8> = Raster::new(rows, cols);
        let mut mask: Raster<u8> = Raster::new(rows, cols);

        for row in 0..rows {
            for col in 0..cols {
                // rows 0..15 class 1, rows 15..20 class 2
                let class = if row < 15 { 1 } else { 2 };
                labels.set(row, col, class).unwrap();
                band.set(row, col, class as f64 * 10.0).unwrap();
                // right half masked out
                mask.set(row, col, (col < 10) as u8).unwrap();
            }
        }

        let image = MultibandImage::from_bands(vec![("B1".to_string(), band)]).unwrap();
        (image, mask, labels)
    }

    #[test]
    fn test_sample_respects_mask() {
        let (image, mask, labels) = fixture();
        let sample =
            stratified_sample(&image, &mask, &labels, &SamplingParams::default()).unwrap();

        // masked area: 20 rows x 10 cols = 200 eligible pixels
        assert_eq!(sample.len(), 200);
        // every drawn point carries the signature of a masked pixel;
        // features came only from eligible cells by construction
        for (fv, &label) in sample.features.iter().zip(&sample.labels) {
            assert_eq!(fv[0], label as f64 * 10.0);
        }
    }

    #[test]
    fn test_proportional_allocation() {
        let (image, mask, labels) = fixture();
        let params = SamplingParams {
            n_points: 100,
            ..Default::default()
        };
        let sample = stratified_sample(&image, &mask, &labels, &params).unwrap();
        let counts = sample.class_counts();

        // classes are 3:1 under the mask (150 vs 50 pixels)
        assert_eq!(sample.len(), counts[1] + counts[2]);
        assert!((70..=80).contains(&counts[1]), "class 1 got {}", counts[1]);
        assert!((20..=30).contains(&counts[2]), "class 2 got {}", counts[2]);
    }

    #[test]
    fn test_short_class_capped_not_duplicated() {
        let (image, mut mask, labels) = fixture();
        // leave class 2 only 3 eligible pixels
        for row in 15..20 {
            for col in 0..10 {
                if !(row == 15 && col < 3) {
                    mask.set(row, col, 0).unwrap();
                }
            }
        }
        let params = SamplingParams {
            n_points: 1000,
            ..Default::default()
        };
        let sample = stratified_sample(&image, &mask, &labels, &params).unwrap();
        let counts = sample.class_counts();

        assert_eq!(counts[2], 3);
        assert_eq!(counts[1], 150);
    }

    #[test]
    fn test_tile_granularity_does_not_change_draw() {
        let (image, mask, labels) = fixture();
        let base = SamplingParams {
            n_points: 60,
            tile_rows: 256,
            seed: 99,
        };
        let fine = SamplingParams {
            tile_rows: 1,
            ..base.clone()
        };
        let odd = SamplingParams {
            tile_rows: 7,
            ..base.clone()
        };

        let a = stratified_sample(&image, &mask, &labels, &base).unwrap();
        let b = stratified_sample(&image, &mask, &labels, &fine).unwrap();
        let c = stratified_sample(&image, &mask, &labels, &odd).unwrap();

        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.features, c.features);
        assert_eq!(a.labels, c.labels);
    }

    #[test]
    fn test_seed_reproducibility() {
        let (image, mask, labels) = fixture();
        let params = SamplingParams {
            n_points: 60,
            ..Default::default()
        };
        let a = stratified_sample(&image, &mask, &labels, &params).unwrap();
        let b = stratified_sample(&image, &mask, &labels, &params).unwrap();
        assert_eq!(a.features, b.features);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_empty_mask_gives_empty_sample() {
        let (image, _, labels) = fixture();
        let mask: Raster<u8> = Raster::new(20, 20);
        let sample =
            stratified_sample(&image, &mask, &labels, &SamplingParams::default()).unwrap();
        assert!(sample.is_empty());
        assert_eq!(sample.classes_present(), Vec::<u8>::new());
    }
}
