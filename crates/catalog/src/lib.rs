//! # Benthos Catalog
//!
//! The external geospatial query service boundary.
//!
//! The classification pipeline never talks HTTP directly; it consumes
//! the [`ImageryProvider`] trait. This crate supplies the trait, the
//! serde wire models for scene search, an async [`ArchiveClient`] with
//! bounded retries and pagination, a blocking [`HttpProvider`] facade,
//! and GeoTIFF decoding for fetched band assets.

pub mod client;
pub mod error;
pub mod geotiff;
pub mod models;
pub mod provider;

pub use client::{ArchiveClient, ArchiveClientOptions, ArchiveEndpoint};
pub use error::{CatalogError, Result};
pub use models::{SceneAsset, ScenePage, SceneRef, SceneSearchParams};
pub use provider::{HttpProvider, ImageryProvider};
