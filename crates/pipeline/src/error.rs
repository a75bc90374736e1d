//! The pipeline's error taxonomy and degraded-mode warnings.
//!
//! Lower-level crates raise their own typed errors; this module is
//! where the classification runner decides what is fatal to a request
//! and what degrades. Nothing here is ever converted to a sentinel
//! value silently: every degradation produces a [`Warning`] that is
//! both logged and returned to the caller.

use std::fmt;

use thiserror::Error;

use benthos_core::ClassLabel;

/// Pipeline stages, in request order. Used for cancellation reporting
/// and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildComposite,
    BuildMask,
    Train,
    Classify,
    Smooth,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildComposite => "BUILD_COMPOSITE",
            Stage::BuildMask => "BUILD_MASK",
            Stage::Train => "TRAIN",
            Stage::Classify => "CLASSIFY",
            Stage::Smooth => "SMOOTH",
        };
        f.write_str(name)
    }
}

/// Errors a classification request can fail with.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No scene passed the region/window/cloud filter. Terminal for the
    /// request; the service never substitutes a zero-filled raster.
    #[error("no scenes in {collection} for {window} under {max_cloud_pct}% cloud cover")]
    EmptyCollection {
        collection: String,
        window: String,
        max_cloud_pct: f64,
    },

    /// A required raster asset could not be fetched. The habitat atlas
    /// is required; a missing label source invalidates the model, so
    /// training fails outright. (Bathymetry is not required; its loss
    /// degrades to an all-true depth term with a warning instead.)
    #[error("asset unavailable: {asset} ({reason})")]
    AssetUnavailable { asset: String, reason: String },

    /// Generic remote failure (network, quota, timeout). Always
    /// recoverable by a caller-level retry; never retried inside the
    /// pipeline.
    #[error("remote evaluation failed: {0}")]
    Remote(#[from] benthos_catalog::CatalogError),

    /// The request was cancelled between stages.
    #[error("request cancelled before {next_stage}")]
    Cancelled { next_stage: Stage },

    #[error("model store error: {0}")]
    Store(String),

    #[error(transparent)]
    Core(#[from] benthos_core::Error),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Degraded-mode events surfaced alongside successful results.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The bathymetry asset was unreachable; the depth term fell back
    /// to all-true.
    BathymetryUnavailable { asset: String, reason: String },

    /// Post-classification smoothing failed; the unsmoothed raster was
    /// returned.
    SmoothingFailed { reason: String },

    /// Habitat classes with zero eligible pixels under the mask. The
    /// model was trained without them; the legend still lists them.
    ClassesDropped { classes: Vec<ClassLabel> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BathymetryUnavailable { asset, reason } => write!(
                f,
                "bathymetry asset {asset} unavailable ({reason}); depth term degraded to all-true"
            ),
            Warning::SmoothingFailed { reason } => {
                write!(f, "post-classification smoothing failed ({reason}); returning unsmoothed raster")
            }
            Warning::ClassesDropped { classes } => {
                write!(f, "classes {classes:?} have no eligible training pixels and were dropped")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::BuildComposite.to_string(), "BUILD_COMPOSITE");
        assert_eq!(Stage::Smooth.to_string(), "SMOOTH");
    }

    #[test]
    fn test_warning_messages() {
        let w = Warning::ClassesDropped { classes: vec![4, 6] };
        assert!(w.to_string().contains("[4, 6]"));

        let w = Warning::BathymetryUnavailable {
            asset: "bathymetry_0".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert!(w.to_string().contains("bathymetry_0"));
        assert!(w.to_string().contains("all-true"));
    }
}
