//! Legends and visualization parameter bundles.
//!
//! Everything rendering needs (class count, per-class name and color,
//! value ranges) is derived deterministically from the remapper's code
//! table in one place. Call sites never hand-write a palette.

use serde::{Deserialize, Serialize};

use benthos_core::ClassLabel;

use benthos_algorithms::remap::CodeTable;

/// RGB color with components in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase hex string without `#`, e.g. `"ffffbe"`.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub class: ClassLabel,
    pub name: String,
    pub color: Rgb,
}

/// The inverse of the code table: class → display name and color,
/// ordered by class. Always lists the full nominal class space; classes
/// dropped from a particular training run render present-but-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    /// Derive the legend from a code table.
    pub fn from_code_table(table: &CodeTable) -> Self {
        let mut entries: Vec<LegendEntry> = table
            .entries()
            .iter()
            .map(|e| LegendEntry {
                class: e.class,
                name: e.name.clone(),
                color: e.color.into(),
            })
            .collect();
        entries.sort_by_key(|e| e.class);
        Self { entries }
    }

    /// All rows, ascending by class.
    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    /// Look up one class.
    pub fn entry(&self, class: ClassLabel) -> Option<&LegendEntry> {
        self.entries.iter().find(|e| e.class == class)
    }

    /// Number of classes including the unclassified row.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rendering parameters for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationSpec {
    /// Bands to render, for multiband layers.
    pub bands: Option<Vec<String>>,
    pub min: f64,
    pub max: f64,
    /// Value ramp or categorical palette.
    pub palette: Vec<Rgb>,
}

impl VisualizationSpec {
    /// Categorical spec for classified rasters, derived from the code
    /// table: min 0, max = highest class, palette indexed by class.
    pub fn classification(table: &CodeTable) -> Self {
        let legend = Legend::from_code_table(table);
        Self {
            bands: None,
            min: 0.0,
            max: table.max_class() as f64,
            palette: legend.entries().iter().map(|e| e.color).collect(),
        }
    }

    /// True-color rendering of a reflectance composite.
    pub fn true_color() -> Self {
        Self {
            bands: Some(vec!["B4".to_string(), "B3".to_string(), "B2".to_string()]),
            min: 100.0,
            max: 3500.0,
            palette: Vec::new(),
        }
    }

    /// Continuous ramp for the NDCI eutrophication indicator.
    pub fn ndci() -> Self {
        Self {
            bands: None,
            min: -0.1,
            max: 0.5,
            palette: vec![
                Rgb::new(0x00, 0x00, 0xff),
                Rgb::new(0xff, 0xff, 0xff),
                Rgb::new(0x00, 0x80, 0x00),
                Rgb::new(0xff, 0xff, 0x00),
                Rgb::new(0xff, 0x00, 0x00),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legend_from_benthic_table() {
        let legend = Legend::from_code_table(&CodeTable::benthic_default());

        assert_eq!(legend.len(), 7);
        assert_eq!(legend.entries()[0].class, 0);
        assert_eq!(legend.entries()[0].name, "Unclassified");
        assert_eq!(legend.entry(3).unwrap().name, "Hard coral");
        assert_eq!(legend.entry(6).unwrap().color.to_hex(), "9bcc4f");
        assert!(legend.entry(7).is_none());
    }

    #[test]
    fn test_classification_spec_tracks_table() {
        let spec = VisualizationSpec::classification(&CodeTable::benthic_default());
        assert_eq!(spec.min, 0.0);
        assert_eq!(spec.max, 6.0);
        assert_eq!(spec.palette.len(), 7);
        assert_eq!(spec.palette[1].to_hex(), "ffffbe");
    }

    #[test]
    fn test_true_color_spec() {
        let spec = VisualizationSpec::true_color();
        assert_eq!(
            spec.bands.as_deref(),
            Some(&["B4".to_string(), "B3".to_string(), "B2".to_string()][..])
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = Legend::from_code_table(&CodeTable::benthic_default());
        let b = Legend::from_code_table(&CodeTable::benthic_default());
        assert_eq!(a, b);
    }
}
