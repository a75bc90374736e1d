//! Error types for the archive boundary.

use thiserror::Error;

/// Errors produced while talking to the remote imagery archive.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("archive search failed after {attempts} attempts: {reason}")]
    SearchFailed { attempts: u32, reason: String },

    #[error("asset unavailable: {id} ({reason})")]
    AssetUnavailable { id: String, reason: String },

    #[error("scene {scene} has no asset for band {band}")]
    MissingBand { scene: String, band: String },

    #[error("GeoTIFF decode failed: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("core error: {0}")]
    Core(#[from] benthos_core::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
