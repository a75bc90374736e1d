//! Cloud-filtered temporal composites.
//!
//! One composite per (region, window, generation): query the archive,
//! drop cloudy scenes, fetch the survivors and reduce them by the
//! pixel-wise median.

use tracing::{debug, info};

use benthos_core::{MultibandImage, Region, TimeWindow};
use benthos_catalog::ImageryProvider;

use benthos_algorithms::median::median_composite;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::sensor::SensorGeneration;

/// Build the median composite for one region/window/generation.
///
/// Scenes whose reported cloud cover exceeds `max_cloud_pct`, or that
/// report none at all, are dropped before anything is fetched. An
/// empty surviving collection is [`PipelineError::EmptyCollection`],
/// never a silent zero-filled raster.
pub fn build_composite(
    provider: &dyn ImageryProvider,
    region: &Region,
    window: &TimeWindow,
    generation: SensorGeneration,
    max_cloud_pct: f64,
    config: &PipelineConfig,
) -> Result<MultibandImage> {
    let collection = generation.collection_id();
    let scenes = provider.find_scenes(region, window, collection)?;
    debug!(collection, total = scenes.len(), "scene search returned");

    let usable: Vec<_> = scenes
        .into_iter()
        .filter(|s| s.cloud_cover().map(|c| c <= max_cloud_pct).unwrap_or(false))
        .collect();

    if usable.is_empty() {
        return Err(PipelineError::EmptyCollection {
            collection: collection.to_string(),
            window: window.to_datetime_range(),
            max_cloud_pct,
        });
    }

    let bands = generation.scene_bands();
    let mut loaded = Vec::with_capacity(usable.len());
    for scene in &usable {
        loaded.push(provider.load_scene(scene, bands, region, config.scale_m)?);
    }

    info!(
        collection,
        scenes = loaded.len(),
        window = %window.to_datetime_range(),
        "reducing scene stack to median composite"
    );
    Ok(median_composite(&loaded)?)
}
