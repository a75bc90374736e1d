//! The imagery provider seam.
//!
//! [`ImageryProvider`] is the interface the classification pipeline
//! consumes; everything remote sits behind it. [`HttpProvider`] is the
//! production implementation: a blocking facade over the async
//! [`ArchiveClient`] with an internal current-thread Tokio runtime, so
//! the single-threaded pipeline can treat provider calls as plain
//! blocking network I/O.

use benthos_core::raster::{GeoTransform, Raster};
use benthos_core::{MultibandImage, Region, TimeWindow};

use crate::client::{ArchiveClient, ArchiveClientOptions, ArchiveEndpoint};
use crate::error::{CatalogError, Result};
use crate::geotiff;
use crate::models::{SceneRef, SceneSearchParams};

/// The external geospatial query service, as the pipeline sees it.
///
/// Implementations must be idempotent: repeating a call with the same
/// arguments performs the same query and mutates nothing. All methods
/// block; latency is network-bound and typically seconds.
pub trait ImageryProvider {
    /// List scenes intersecting `region` within `window`, with their
    /// cloud-cover metadata. An empty list is a valid answer; the
    /// caller decides whether that is an error.
    fn find_scenes(
        &self,
        region: &Region,
        window: &TimeWindow,
        collection: &str,
    ) -> Result<Vec<SceneRef>>;

    /// Fetch the named bands of one scene, clipped and resampled
    /// server-side to `region` at `scale_m` metres per pixel.
    fn load_scene(
        &self,
        scene: &SceneRef,
        bands: &[&str],
        region: &Region,
        scale_m: f64,
    ) -> Result<MultibandImage>;

    /// Fetch a standalone raster asset (bathymetry, habitat atlas) by
    /// its stable identifier, clipped to `region` at `scale_m`.
    fn load_asset(&self, asset_id: &str, region: &Region, scale_m: f64) -> Result<Raster<f64>>;
}

/// Production provider: archive search plus per-band GeoTIFF fetch.
pub struct HttpProvider {
    rt: tokio::runtime::Runtime,
    client: ArchiveClient,
    /// Base URL for standalone assets (`{base}/{asset_id}.tif`).
    asset_base_url: String,
}

impl HttpProvider {
    /// Create a provider against an archive endpoint and an asset base
    /// URL.
    pub fn new(
        endpoint: ArchiveEndpoint,
        asset_base_url: impl Into<String>,
        options: ArchiveClientOptions,
    ) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;
        let client = ArchiveClient::new(endpoint, options)?;
        Ok(Self {
            rt,
            client,
            asset_base_url: asset_base_url.into(),
        })
    }

    /// Append the clip/resample query the archive applies server-side.
    fn windowed(href: &str, region: &Region, scale_m: f64) -> String {
        let [w, s, e, n] = region.to_bbox();
        let sep = if href.contains('?') { '&' } else { '?' };
        format!("{href}{sep}bbox={w},{s},{e},{n}&scale={scale_m}")
    }
}

impl ImageryProvider for HttpProvider {
    fn find_scenes(
        &self,
        region: &Region,
        window: &TimeWindow,
        collection: &str,
    ) -> Result<Vec<SceneRef>> {
        let params = SceneSearchParams::new()
            .bbox(region.to_bbox())
            .datetime(&window.to_datetime_range())
            .collection(collection);
        self.rt.block_on(self.client.search_all(&params))
    }

    fn load_scene(
        &self,
        scene: &SceneRef,
        bands: &[&str],
        region: &Region,
        scale_m: f64,
    ) -> Result<MultibandImage> {
        let (transform, rows, cols) = GeoTransform::for_region(region, scale_m);

        let mut image = MultibandImage::new();
        for &band in bands {
            let asset = scene.asset(band).ok_or_else(|| CatalogError::MissingBand {
                scene: scene.id.clone(),
                band: band.to_string(),
            })?;

            let url = Self::windowed(&asset.href, region, scale_m);
            let bytes = self.rt.block_on(self.client.fetch_asset(&url))?;
            let mut raster = geotiff::decode_band(&bytes)?;

            if raster.shape() != (rows, cols) {
                return Err(CatalogError::Decode(format!(
                    "asset {} returned {:?}, requested ({rows}, {cols})",
                    asset.href,
                    raster.shape()
                )));
            }
            raster.set_transform(transform);
            image.push_band(band, raster).map_err(CatalogError::Core)?;
        }
        Ok(image)
    }

    fn load_asset(&self, asset_id: &str, region: &Region, scale_m: f64) -> Result<Raster<f64>> {
        let (transform, rows, cols) = GeoTransform::for_region(region, scale_m);
        let href = format!("{}/{}.tif", self.asset_base_url.trim_end_matches('/'), asset_id);
        let url = Self::windowed(&href, region, scale_m);

        let bytes = self.rt.block_on(self.client.fetch_asset(&url))?;
        let mut raster = geotiff::decode_band(&bytes)?;
        if raster.shape() != (rows, cols) {
            return Err(CatalogError::Decode(format!(
                "asset {asset_id} returned {:?}, requested ({rows}, {cols})",
                raster.shape()
            )));
        }
        raster.set_transform(transform);
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_url() {
        let region = Region::new(119.0, 23.0, 120.0, 24.0).unwrap();
        let url = HttpProvider::windowed("https://x.com/b.tif", &region, 10.0);
        assert_eq!(url, "https://x.com/b.tif?bbox=119,23,120,24&scale=10");

        let url2 = HttpProvider::windowed("https://x.com/b.tif?v=2", &region, 10.0);
        assert!(url2.starts_with("https://x.com/b.tif?v=2&bbox="));
    }
}
