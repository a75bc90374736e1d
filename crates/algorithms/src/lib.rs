//! # Benthos Algorithms
//!
//! Pixel-level computation for the habitat classification service.
//!
//! ## Modules
//!
//! - **indices**: normalized-difference spectral indices (NDWI, NDCI)
//! - **mask_ops**: boolean raster algebra for inclusion masks
//! - **focal_mode**: circular majority filter (mask smoothing and
//!   post-classification cleanup)
//! - **remap**: habitat-atlas code table and label remapping
//! - **median**: temporal median composites
//! - **sampling**: stratified, mask-constrained training samples
//! - **forest**: random-forest training
//! - **classify**: applying a trained forest to an image

pub mod classify;
pub mod focal_mode;
pub mod forest;
pub mod indices;
pub mod mask_ops;
pub mod median;
pub mod remap;
pub mod sampling;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::classify_image;
    pub use crate::focal_mode::focal_mode;
    pub use crate::forest::{RandomForest, RandomForestParams};
    pub use crate::indices::{ndci, ndwi, normalized_difference};
    pub use crate::mask_ops::{and, band_between, bits_clear, eq_code, gt};
    pub use crate::median::median_composite;
    pub use crate::remap::{remap, CodeTable};
    pub use crate::sampling::{stratified_sample, SamplingParams, TrainingSample};
    pub use benthos_core::prelude::*;
}
