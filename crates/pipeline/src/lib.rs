//! # Benthos Pipeline
//!
//! The supervised habitat classification service.
//!
//! A [`ClassificationSession`] owns an imagery provider and a
//! configuration, builds cloud-filtered median composites and
//! year-specific water masks, trains one random-forest model from the
//! reference year's habitat atlas, and classifies any number of target
//! windows with it. Results carry their legend and every degraded-mode
//! warning that occurred on the way.
//!
//! Stage order per request:
//!
//! ```text
//! BUILD_COMPOSITE -> BUILD_MASK -> (TRAIN) -> CLASSIFY -> (SMOOTH) -> DONE
//! ```
//!
//! Composite failure is terminal; training failure evicts the cached
//! model; smoothing failure degrades to the unsmoothed raster with a
//! warning.

pub mod composite;
pub mod config;
pub mod error;
pub mod indicator;
pub mod legend;
pub mod mask;
pub mod model_store;
pub mod sensor;
pub mod session;

pub use config::PipelineConfig;
pub use error::{PipelineError, Stage, Warning};
pub use legend::{Legend, LegendEntry, Rgb, VisualizationSpec};
pub use sensor::{GenerationRule, SensorGeneration};
pub use session::{CancelToken, Classification, ClassificationSession, ClassifiedRaster};
