//! Habitat-atlas label remapping
//!
//! External habitat atlases publish sparse categorical codes; the
//! classifier wants a dense small integer class space. A [`CodeTable`]
//! is the single source of truth for that mapping and for the legend
//! that inverts it.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use benthos_core::raster::Raster;
use benthos_core::{ClassLabel, Error, RasterElement, Result};

/// One row of a code table: an external atlas code mapped to an internal
/// class with its display name and color.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeEntry {
    /// Raw categorical code as published by the atlas
    pub external_code: i32,
    /// Dense internal class label (0 = unclassified)
    pub class: ClassLabel,
    /// Display name for the legend
    pub name: String,
    /// Display color as (r, g, b)
    pub color: (u8, u8, u8),
}

/// An explicit ordered mapping from external atlas codes to the internal
/// class space.
///
/// Total: every input code maps to exactly one class; codes not in the
/// table map to the reserved class 0. Invertible: [`CodeTable::entries`]
/// drives legend and palette rendering, so class names and colors are
/// never duplicated at call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeTable {
    entries: Vec<CodeEntry>,
}

impl CodeTable {
    /// Build a table from entries. Duplicate external codes are
    /// rejected; the first entry should map the atlas's own no-data
    /// code to class 0.
    pub fn new(entries: Vec<CodeEntry>) -> Result<Self> {
        for (i, e) in entries.iter().enumerate() {
            if entries[..i].iter().any(|p| p.external_code == e.external_code) {
                return Err(Error::InvalidParameter {
                    name: "code_table",
                    value: e.external_code.to_string(),
                    reason: "duplicate external code".to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    /// The benthic habitat table used by the reef monitoring pages:
    /// Allen Coral Atlas benthic codes onto classes 0..=6.
    pub fn benthic_default() -> Self {
        let rows: [(i32, ClassLabel, &str, (u8, u8, u8)); 7] = [
            (0, 0, "Unclassified", (0x00, 0x00, 0x00)),
            (11, 1, "Sand", (0xff, 0xff, 0xbe)),
            (12, 2, "Sand with algae", (0xe0, 0xd0, 0x5e)),
            (13, 3, "Hard coral", (0xb1, 0x9c, 0x3a)),
            (14, 4, "Soft coral", (0x66, 0x84, 0x38)),
            (15, 5, "Rubble", (0xff, 0x61, 0x61)),
            (18, 6, "Seagrass", (0x9b, 0xcc, 0x4f)),
        ];
        Self {
            entries: rows
                .into_iter()
                .map(|(external_code, class, name, color)| CodeEntry {
                    external_code,
                    class,
                    name: name.to_string(),
                    color,
                })
                .collect(),
        }
    }

    /// Map one external code to its internal class; unmapped codes give 0.
    pub fn map_code(&self, code: i32) -> ClassLabel {
        self.entries
            .iter()
            .find(|e| e.external_code == code)
            .map(|e| e.class)
            .unwrap_or(0)
    }

    /// All table rows, in order (the legend's inverse mapping).
    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    /// Highest internal class in the table.
    pub fn max_class(&self) -> ClassLabel {
        self.entries.iter().map(|e| e.class).max().unwrap_or(0)
    }

    /// Classes other than 0, i.e. the habitat classes a training sample
    /// can contain.
    pub fn habitat_classes(&self) -> Vec<ClassLabel> {
        self.entries.iter().map(|e| e.class).filter(|&c| c != 0).collect()
    }
}

/// Remap an atlas label raster onto the internal class space.
///
/// Pure and total: every pixel gets exactly one output class, no-data
/// and unmapped codes both land on 0. Identical inputs produce
/// bit-identical outputs.
pub fn remap(label_raster: &Raster<i32>, table: &CodeTable) -> Result<Raster<u8>> {
    let (rows, cols) = label_raster.shape();
    let nodata = label_raster.nodata();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for col in 0..cols {
                let code = unsafe { label_raster.get_unchecked(row, col) };
                if code.is_nodata(nodata) {
                    continue;
                }
                row_data[col] = table.map_code(code);
            }
            row_data
        })
        .collect();

    let mut output = label_raster.with_same_meta::<u8>();
    output.set_nodata(Some(0));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
