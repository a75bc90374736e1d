//! Classification sessions.
//!
//! A session owns the provider and configuration, memoizes composites,
//! masks and the trained model by their full parameter tuples, and
//! drives the per-request state machine. The trained model is the only
//! object shared across requests, and it is shared read-only; every
//! request carries its own composite and mask.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lru::LruCache;
use tracing::{info, warn};

use benthos_algorithms::classify::classify_image;
use benthos_algorithms::focal_mode::{focal_mode_labels, radius_in_cells};
use benthos_algorithms::forest::{RandomForest, RandomForestParams};
use benthos_algorithms::remap::{remap, CodeTable};
use benthos_algorithms::sampling::{stratified_sample, SamplingParams};
use benthos_catalog::ImageryProvider;
use benthos_core::raster::Raster;
use benthos_core::{Mask, MultibandImage, RasterElement, Region, TimeWindow};

use crate::composite::build_composite;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, Stage, Warning};
use crate::indicator;
use crate::legend::{Legend, VisualizationSpec};
use crate::mask::{build_mask, log_bathymetry_fallback, MaskParams};
use crate::model_store::ModelStore;
use crate::sensor::{SensorGeneration, FEATURE_BAND_PREFIX};

/// Cooperative cancellation flag, checked between pipeline stages.
///
/// Stages never mutate shared state in place, so cancelling between
/// them leaves nothing partially applied; a cancelled request simply
/// stops producing.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next stage boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fn checkpoint(cancel: &CancelToken, next_stage: Stage) -> Result<()> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled { next_stage })
    } else {
        Ok(())
    }
}

/// A classified label raster with its provenance.
#[derive(Debug, Clone)]
pub struct ClassifiedRaster {
    /// Per-pixel class labels; 0 = unclassified / outside mask.
    pub labels: Raster<u8>,
    /// The target window the raster was classified for.
    pub window: TimeWindow,
    /// Sensor generation the target composite came from.
    pub generation: SensorGeneration,
    /// Smoothing radius actually applied, in metres.
    pub smoothing_radius_m: f64,
}

/// A successful classification result.
#[derive(Debug, Clone)]
pub struct Classification {
    pub raster: ClassifiedRaster,
    pub legend: Legend,
    /// Degraded-mode events that occurred on the way; empty on a fully
    /// clean run.
    pub warnings: Vec<Warning>,
}

// ---------------------------------------------------------------------------
// Cache keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CompositeKey {
    region: [u64; 4],
    window: TimeWindow,
    generation: SensorGeneration,
    scale: u64,
    max_cloud: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MaskKey {
    composite: CompositeKey,
    depth_ceiling: u64,
    water_threshold: u64,
    radius: u64,
    with_depth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ModelKey {
    region: [u64; 4],
    reference_window: TimeWindow,
    generation: SensorGeneration,
    scale: u64,
    depth_ceiling: u64,
    water_threshold: u64,
    radius: u64,
    with_depth: bool,
    n_points: usize,
    seed: u64,
    n_trees: usize,
    max_tree_depth: usize,
    min_leaf: usize,
    atlas: String,
}

impl ModelKey {
    /// Stable hash for the on-disk model store.
    fn digest(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut h);
        h.finish()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A classification session over one provider and configuration.
pub struct ClassificationSession<P: ImageryProvider> {
    provider: P,
    config: PipelineConfig,
    code_table: CodeTable,
    composites: LruCache<CompositeKey, Arc<MultibandImage>>,
    masks: LruCache<MaskKey, Arc<Mask>>,
    models: HashMap<ModelKey, Arc<RandomForest>>,
    depth_cache: HashMap<[u64; 4], Arc<Raster<f64>>>,
    store: Option<ModelStore>,
}

impl<P: ImageryProvider> ClassificationSession<P> {
    /// Create a session with the default benthic code table.
    pub fn new(provider: P, config: PipelineConfig) -> Self {
        Self::with_code_table(provider, config, CodeTable::benthic_default())
    }

    /// Create a session with an explicit code table.
    pub fn with_code_table(provider: P, config: PipelineConfig, code_table: CodeTable) -> Self {
        let cap = NonZeroUsize::new(8).expect("nonzero");
        Self {
            provider,
            config,
            code_table,
            composites: LruCache::new(cap),
            masks: LruCache::new(cap),
            models: HashMap::new(),
            depth_cache: HashMap::new(),
            store: None,
        }
    }

    /// Attach an on-disk model store so a fitted forest survives
    /// process restarts.
    pub fn with_model_store(mut self, store: ModelStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The legend derived from this session's code table.
    pub fn legend(&self) -> Legend {
        Legend::from_code_table(&self.code_table)
    }

    /// Visualization parameters for classified rasters.
    pub fn visualization(&self) -> VisualizationSpec {
        VisualizationSpec::classification(&self.code_table)
    }

    /// Classify one target window.
    ///
    /// Stage order: BUILD_COMPOSITE → BUILD_MASK → TRAIN (if no cached
    /// model) → CLASSIFY → SMOOTH → DONE. The `cancel` token is honored
    /// between stages.
    pub fn get_classification(
        &mut self,
        region: &Region,
        target_window: TimeWindow,
        cancel: &CancelToken,
    ) -> Result<Classification> {
        let mut warnings = Vec::new();

        // BUILD_COMPOSITE: failure here is terminal for the request
        let generation = self.config.generation_rule.resolve(&target_window);
        let target_composite = self.composite(
            region,
            &target_window,
            generation,
            self.config.max_cloud_cover_pct,
        )?;
        checkpoint(cancel, Stage::BuildMask)?;

        // BUILD_MASK: year-specific, never reused across windows
        let depth = self.depth(region, &mut warnings);
        let target_mask =
            self.mask(region, &target_window, generation, depth.clone())?;
        checkpoint(cancel, Stage::Train)?;

        // TRAIN: once per parameter tuple; an empty training sample
        // short-circuits to an all-nodata result (never a crash)
        let key = self.model_key(region, depth.is_some());
        let cached = self.models.get(&key).map(Arc::clone);
        let model = match cached {
            Some(model) => model,
            None => match self.train(region, &key, depth.clone(), &mut warnings)? {
                Some(model) => {
                    self.models.insert(key, Arc::clone(&model));
                    model
                }
                None => {
                    let mut labels = target_mask.like(0);
                    labels.set_nodata(Some(0));
                    return Ok(Classification {
                        raster: ClassifiedRaster {
                            labels,
                            window: target_window,
                            generation,
                            smoothing_radius_m: self.config.smoothing_radius_m,
                        },
                        legend: self.legend(),
                        warnings,
                    });
                }
            },
        };
        checkpoint(cancel, Stage::Classify)?;

        // CLASSIFY: masked pixels only, model is read-only
        let features = target_composite.select_prefix(FEATURE_BAND_PREFIX);
        let classified = classify_image(&model, &features, &target_mask)?;
        checkpoint(cancel, Stage::Smooth)?;

        // SMOOTH: failure degrades to the unsmoothed raster
        let cell_m = classified.transform().cell_size_m();
        let radius = radius_in_cells(cell_m, self.config.smoothing_radius_m);
        let labels = if radius > 0 {
            match focal_mode_labels(&classified, radius) {
                Ok(smoothed) => smoothed,
                Err(e) => {
                    warn!(error = %e, "post-classification smoothing failed; returning unsmoothed raster");
                    warnings.push(Warning::SmoothingFailed {
                        reason: e.to_string(),
                    });
                    classified
                }
            }
        } else {
            classified
        };

        Ok(Classification {
            raster: ClassifiedRaster {
                labels,
                window: target_window,
                generation,
                smoothing_radius_m: self.config.smoothing_radius_m,
            },
            legend: self.legend(),
            warnings,
        })
    }

    /// NDCI eutrophication indicator for one window (continuous layer,
    /// no classification involved).
    pub fn ndci_indicator(
        &mut self,
        region: &Region,
        window: TimeWindow,
    ) -> Result<(Raster<f64>, VisualizationSpec)> {
        let generation = self.config.generation_rule.resolve(&window);
        let composite = self.composite(
            region,
            &window,
            generation,
            self.config.ndci_max_cloud_cover_pct,
        )?;
        let layer = indicator::ndci_layer(&composite)?;
        Ok((layer, VisualizationSpec::ndci()))
    }

    // ── Stage helpers ───────────────────────────────────────────────

    fn composite(
        &mut self,
        region: &Region,
        window: &TimeWindow,
        generation: SensorGeneration,
        max_cloud_pct: f64,
    ) -> Result<Arc<MultibandImage>> {
        let key = CompositeKey {
            region: region.cache_key(),
            window: *window,
            generation,
            scale: self.config.scale_m.to_bits(),
            max_cloud: max_cloud_pct.to_bits(),
        };
        if let Some(hit) = self.composites.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let built = Arc::new(build_composite(
            &self.provider,
            region,
            window,
            generation,
            max_cloud_pct,
            &self.config,
        )?);
        self.composites.put(key, Arc::clone(&built));
        Ok(built)
    }

    fn mask(
        &mut self,
        region: &Region,
        window: &TimeWindow,
        generation: SensorGeneration,
        depth: Option<Arc<Raster<f64>>>,
    ) -> Result<Arc<Mask>> {
        let key = MaskKey {
            composite: CompositeKey {
                region: region.cache_key(),
                window: *window,
                generation,
                scale: self.config.scale_m.to_bits(),
                max_cloud: self.config.max_cloud_cover_pct.to_bits(),
            },
            depth_ceiling: self.config.depth_ceiling_m.to_bits(),
            water_threshold: self.config.water_index_threshold.to_bits(),
            radius: self.config.smoothing_radius_m.to_bits(),
            with_depth: depth.is_some(),
        };
        if let Some(hit) = self.masks.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let composite =
            self.composite(region, window, generation, self.config.max_cloud_cover_pct)?;
        let params = MaskParams {
            depth_ceiling_m: self.config.depth_ceiling_m,
            water_index_threshold: self.config.water_index_threshold,
            smoothing_radius_m: self.config.smoothing_radius_m,
        };
        let mask = Arc::new(build_mask(
            &composite,
            depth.as_deref(),
            generation,
            &params,
        )?);
        self.masks.put(key, Arc::clone(&mask));
        Ok(mask)
    }

    /// Fetch (and cache) the bathymetry raster. Failure degrades: the
    /// depth term becomes all-true, the caller gets a warning, and the
    /// fetch is retried on the next request.
    fn depth(&mut self, region: &Region, warnings: &mut Vec<Warning>) -> Option<Arc<Raster<f64>>> {
        let key = region.cache_key();
        if let Some(hit) = self.depth_cache.get(&key) {
            return Some(Arc::clone(hit));
        }
        match self.provider.load_asset(
            &self.config.bathymetry_asset,
            region,
            self.config.scale_m,
        ) {
            Ok(raster) => {
                let arc = Arc::new(raster);
                self.depth_cache.insert(key, Arc::clone(&arc));
                Some(arc)
            }
            Err(e) => {
                log_bathymetry_fallback(&self.config.bathymetry_asset, &e.to_string());
                warnings.push(Warning::BathymetryUnavailable {
                    asset: self.config.bathymetry_asset.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn model_key(&self, region: &Region, with_depth: bool) -> ModelKey {
        let reference_window = self.config.reference_window();
        ModelKey {
            region: region.cache_key(),
            reference_window,
            generation: self.config.generation_rule.resolve(&reference_window),
            scale: self.config.scale_m.to_bits(),
            depth_ceiling: self.config.depth_ceiling_m.to_bits(),
            water_threshold: self.config.water_index_threshold.to_bits(),
            radius: self.config.smoothing_radius_m.to_bits(),
            with_depth,
            n_points: self.config.n_training_points,
            seed: self.config.seed,
            n_trees: self.config.n_trees,
            max_tree_depth: self.config.max_tree_depth,
            min_leaf: self.config.min_leaf,
            atlas: self.config.habitat_atlas_asset.clone(),
        }
    }

    /// TRAIN stage. Returns `None` when no eligible training pixel
    /// exists at all (the all-nodata path). Models are inserted into
    /// the cache only on success, so a training failure leaves no stale
    /// entry behind and the next request retrains from scratch.
    fn train(
        &mut self,
        region: &Region,
        key: &ModelKey,
        depth: Option<Arc<Raster<f64>>>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<Arc<RandomForest>>> {
        // on-disk hit skips the remote work entirely
        if let Some(store) = &self.store {
            match store.load(key.digest()) {
                Ok(Some(model)) => {
                    info!(digest = key.digest(), "loaded model from store");
                    return Ok(Some(Arc::new(model)));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "model store read failed; retraining"),
            }
        }

        let reference_window = self.config.reference_window();
        let generation = self.config.generation_rule.resolve(&reference_window);

        let composite = self.composite(
            region,
            &reference_window,
            generation,
            self.config.max_cloud_cover_pct,
        )?;
        let mask = self.mask(region, &reference_window, generation, depth)?;

        // the atlas is required: without labels there is no model
        let atlas = self
            .provider
            .load_asset(
                &self.config.habitat_atlas_asset,
                region,
                self.config.scale_m,
            )
            .map_err(|e| PipelineError::AssetUnavailable {
                asset: self.config.habitat_atlas_asset.clone(),
                reason: e.to_string(),
            })?;
        let labels = remap(&to_code_raster(&atlas), &self.code_table)?;

        let features = composite.select_prefix(FEATURE_BAND_PREFIX);
        let sample = stratified_sample(
            &features,
            &mask,
            &labels,
            &SamplingParams {
                n_points: self.config.n_training_points,
                tile_rows: self.config.tile_rows,
                seed: self.config.seed,
            },
        )?;

        if sample.is_empty() {
            let classes = self.code_table.habitat_classes();
            warn!(?classes, "no eligible training pixels under the mask");
            warnings.push(Warning::ClassesDropped { classes });
            return Ok(None);
        }

        let present = sample.classes_present();
        let dropped: Vec<u8> = self
            .code_table
            .habitat_classes()
            .into_iter()
            .filter(|c| !present.contains(c))
            .collect();
        if !dropped.is_empty() {
            warn!(?dropped, "training proceeds without empty classes");
            warnings.push(Warning::ClassesDropped { classes: dropped });
        }

        info!(points = sample.len(), trees = self.config.n_trees, "training classifier");
        let model = RandomForest::fit(
            &sample,
            &RandomForestParams {
                n_trees: self.config.n_trees,
                max_depth: self.config.max_tree_depth,
                min_leaf: self.config.min_leaf,
                seed: self.config.seed,
            },
        )?;

        if let Some(store) = &self.store {
            if let Err(e) = store.save(key.digest(), &model) {
                warn!(error = %e, "model store write failed");
            }
        }
        Ok(Some(Arc::new(model)))
    }
}

/// Quantize a float atlas band to integer codes; no-data becomes a
/// sentinel code no table maps.
fn to_code_raster(band: &Raster<f64>) -> Raster<i32> {
    let nodata = band.nodata();
    let mut out = band.map(move |v| {
        if v.is_nodata(nodata) {
            i32::MIN
        } else {
            v.round() as i32
        }
    });
    out.set_nodata(Some(i32::MIN));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(checkpoint(&token, Stage::Train).is_ok());

        token.cancel();
        assert!(token.is_cancelled());
        let err = checkpoint(&token, Stage::Classify).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cancelled {
                next_stage: Stage::Classify
            }
        ));
    }

    #[test]
    fn test_to_code_raster() {
        let mut band = Raster::from_vec(vec![11.2, 0.0, f64::NAN, 17.9], 2, 2).unwrap();
        band.set_nodata(Some(f64::NAN));

        let codes = to_code_raster(&band);
        assert_eq!(codes.get(0, 0).unwrap(), 11);
        assert_eq!(codes.get(0, 1).unwrap(), 0);
        assert_eq!(codes.get(1, 0).unwrap(), i32::MIN);
        assert_eq!(codes.get(1, 1).unwrap(), 18);
    }
}
