//! Circular majority (mode) filter
//!
//! The one smoothing primitive the service uses, in two places: closing
//! small holes in water masks, and cleaning salt-and-pepper noise from
//! classified label rasters. Radius 0 is the identity.

use ndarray::Array2;
use rayon::prelude::*;

use benthos_core::raster::Raster;
use benthos_core::{Error, Result};

/// Apply a circular majority filter to a boolean mask.
///
/// Each output cell takes the most frequent value among the input cells
/// within `radius_cells` (Euclidean distance, circle kernel). Both 0 and
/// 1 vote: the filter fills small holes and removes small specks. Edge
/// cells use the part of the window that is in bounds.
///
/// `radius_cells == 0` returns an exact copy, so the no-op case is
/// trivially idempotent.
///
/// Tie-break: when two values are equally frequent the smaller value
/// wins. This is implementation-specific and excluded from the
/// bit-identical determinism guarantee of the pure steps.
pub fn focal_mode(raster: &Raster<u8>, radius_cells: usize) -> Result<Raster<u8>> {
    mode_filter(raster, radius_cells, false)
}

/// Apply the same circular majority filter to a classified label
/// raster.
///
/// Label 0 is "unclassified / no data": it never votes, and cells that
/// are 0 in the input stay 0 in the output, so cleanup can never extend
/// the classification outside the target mask.
pub fn focal_mode_labels(raster: &Raster<u8>, radius_cells: usize) -> Result<Raster<u8>> {
    mode_filter(raster, radius_cells, true)
}

fn mode_filter(raster: &Raster<u8>, radius_cells: usize, zero_is_nodata: bool) -> Result<Raster<u8>> {
    if radius_cells == 0 {
        return Ok(raster.clone());
    }

    let (rows, cols) = raster.shape();
    let r = radius_cells as isize;
    let r_sq = (radius_cells * radius_cells) as isize;

    // circular window offsets
    let mut offsets: Vec<(isize, isize)> = Vec::new();
    for dr in -r..=r {
        for dc in -r..=r {
            if dr * dr + dc * dc <= r_sq {
                offsets.push((dr, dc));
            }
        }
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            let mut counts = [0u32; 256];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { raster.get_unchecked(row, col) };
                if zero_is_nodata && center == 0 {
                    continue;
                }

                counts.fill(0);
                let mut total = 0u32;

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                        let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                        if zero_is_nodata && v == 0 {
                            continue;
                        }
                        counts[v as usize] += 1;
                        total += 1;
                    }
                }

                if total == 0 {
                    *out = center;
                    continue;
                }

                // smaller value wins ties
                let mut best = if zero_is_nodata { 1usize } else { 0usize };
                for (value, &count) in counts.iter().enumerate() {
                    if count > counts[best] {
                        best = value;
                    }
                }
                *out = best as u8;
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<u8>();
    output.set_nodata(raster.nodata());
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Convert a smoothing radius in metres to whole cells for a raster,
/// rounding to the nearest cell. A radius smaller than half a cell
/// collapses to 0 (no smoothing).
pub fn radius_in_cells(raster_cell_size_m: f64, radius_m: f64) -> usize {
    if raster_cell_size_m <= 0.0 || radius_m <= 0.0 {
        return 0;
    }
    (radius_m / raster_cell_size_m).round() as usize
}
