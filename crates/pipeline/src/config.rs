//! Pipeline configuration.
//!
//! Every tunable the source material disagreed with itself about lives
//! here as an explicit parameter with one documented default. Entry
//! points take these values from configuration; there is no ambient
//! session state and nothing is re-derived ad hoc downstream.

use serde::{Deserialize, Serialize};

use benthos_core::TimeWindow;

use crate::sensor::GenerationRule;

/// Tunables for a classification session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ground resolution in metres per pixel.
    pub scale_m: f64,

    /// Scenes with reported cloud cover above this percentage are
    /// dropped before compositing. Scenes without the property are
    /// always dropped.
    pub max_cloud_cover_pct: f64,

    /// Water-index threshold for legacy water detection (NDWI > t).
    /// The source history oscillates between 0.0 and 0.1; this is a
    /// required parameter precisely because of that ambiguity.
    pub water_index_threshold: f64,

    /// Depth inclusion ceiling in metres: pixels with
    /// `0 < depth < ceiling` participate. The source history shows
    /// 20 m, 30 m and a centimetre-unit bug; the pipeline works in
    /// metres only.
    pub depth_ceiling_m: f64,

    /// Circular majority-filter radius in metres; 0 disables smoothing
    /// for both masks and classified rasters.
    pub smoothing_radius_m: f64,

    /// Total stratified training point budget.
    pub n_training_points: usize,

    /// Rows per sampling tile (memory knob; never changes the draw).
    pub tile_rows: usize,

    /// Seed for the training point draw and forest bootstrapping.
    pub seed: u64,

    /// Trees in the random-forest ensemble. Useful values sit in the
    /// 30-100 range; more trees cost render latency.
    pub n_trees: usize,

    /// Maximum tree depth.
    pub max_tree_depth: usize,

    /// Minimum samples per leaf.
    pub min_leaf: usize,

    /// The fixed reference year whose atlas labels train the model.
    pub reference_year: i32,

    /// Year threshold splitting legacy and harmonized products.
    pub generation_rule: GenerationRule,

    /// Stable identifier of the bathymetry raster asset.
    pub bathymetry_asset: String,

    /// Stable identifier of the habitat-atlas raster asset.
    pub habitat_atlas_asset: String,

    /// Cloud-cover ceiling for the NDCI eutrophication indicator,
    /// which tolerates more cloud than classification composites.
    pub ndci_max_cloud_cover_pct: f64,
}

impl PipelineConfig {
    /// The reference window the model is trained on (full calendar
    /// year; the atlas snapshot is annual).
    pub fn reference_window(&self) -> TimeWindow {
        TimeWindow::full_year(self.reference_year)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale_m: 10.0,
            max_cloud_cover_pct: 20.0,
            water_index_threshold: 0.1,
            depth_ceiling_m: 20.0,
            smoothing_radius_m: 30.0,
            n_training_points: 1000,
            tile_rows: 256,
            seed: 7,
            n_trees: 50,
            max_tree_depth: 12,
            min_leaf: 2,
            reference_year: 2018,
            generation_rule: GenerationRule::default(),
            bathymetry_asset: "bathymetry_0".to_string(),
            habitat_atlas_asset: "reef_habitat_v2".to_string(),
            ndci_max_cloud_cover_pct: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.water_index_threshold, 0.1);
        assert_eq!(cfg.depth_ceiling_m, 20.0);
        assert_eq!(cfg.n_trees, 50);
        assert_eq!(cfg.reference_window(), TimeWindow::full_year(2018));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"depth_ceiling_m": 30.0, "n_trees": 100}"#).unwrap();
        assert_eq!(cfg.depth_ceiling_m, 30.0);
        assert_eq!(cfg.n_trees, 100);
        assert_eq!(cfg.water_index_threshold, 0.1);
        assert_eq!(cfg.reference_year, 2018);
    }
}
