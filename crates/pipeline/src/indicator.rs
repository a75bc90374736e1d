//! NDCI eutrophication indicator.
//!
//! Chlorophyll concentration is a leading pressure signal for reef
//! habitats: sustained high NDCI marks nutrient-loaded water before the
//! habitat map shows damage. The indicator is a continuous layer; no
//! threshold is applied.

use benthos_core::raster::Raster;
use benthos_core::MultibandImage;

use benthos_algorithms::indices::ndci;

use crate::error::Result;
use crate::sensor::{BAND_RED, BAND_RED_EDGE};

/// Compute the NDCI layer of a composite.
pub fn ndci_layer(composite: &MultibandImage) -> Result<Raster<f64>> {
    Ok(ndci(composite, BAND_RED_EDGE, BAND_RED)?)
}
