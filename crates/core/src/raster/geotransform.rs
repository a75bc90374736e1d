//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Mean metres per degree of latitude, used to size pixel grids from
/// lon/lat regions at a metric ground resolution.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and geographic
/// coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// All rasters in this service are north-up: `pixel_height` is negative
/// and there is no rotation term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, negative)
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a new north-up GeoTransform
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Build the transform and grid shape covering `region` at a metric
    /// ground resolution (`scale_m` metres per pixel).
    ///
    /// Returns `(transform, rows, cols)`. Every provider fetch and clip
    /// in the pipeline goes through this so that composites, masks and
    /// assets for the same region are co-registered.
    pub fn for_region(region: &Region, scale_m: f64) -> (Self, usize, usize) {
        let deg = scale_m / METERS_PER_DEGREE;
        let cols = ((region.max_lon - region.min_lon) / deg).ceil().max(1.0) as usize;
        let rows = ((region.max_lat - region.min_lat) / deg).ceil().max(1.0) as usize;
        let gt = Self::new(region.min_lon, region.max_lat, deg, -deg);
        (gt, rows, cols)
    }

    /// Convert pixel coordinates to geographic coordinates (pixel center)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Convert geographic coordinates to fractional pixel coordinates;
    /// use `.floor()` to get integer indices
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let col = (x - self.origin_x) / self.pixel_width;
        let row = (y - self.origin_y) / self.pixel_height;
        (col, row)
    }

    /// Cell size in CRS units (assumes square pixels)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Cell size in metres on the ground
    pub fn cell_size_m(&self) -> f64 {
        self.cell_size() * METERS_PER_DEGREE
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` for a raster of the
    /// given dimensions
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + cols as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + rows as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
