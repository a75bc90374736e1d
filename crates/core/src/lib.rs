//! # Benthos Core
//!
//! Core types for the benthos habitat classification service.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced single-band grid
//! - `MultibandImage`: named set of co-registered bands
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Region`: lon/lat bounding box
//! - `TimeWindow`: half-open date interval for scene selection

pub mod error;
pub mod image;
pub mod raster;
pub mod region;
pub mod time;

pub use error::{Error, Result};
pub use image::MultibandImage;
pub use raster::{GeoTransform, Raster, RasterElement};
pub use region::Region;
pub use time::TimeWindow;

/// Class label for habitat rasters. 0 is reserved for "no data / unclassified".
pub type ClassLabel = u8;

/// Boolean inclusion mask: 1 = pixel participates, 0 = excluded.
pub type Mask = Raster<u8>;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::MultibandImage;
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::region::Region;
    pub use crate::time::TimeWindow;
    pub use crate::{ClassLabel, Mask};
}
