//! On-disk persistence for fitted models.
//!
//! Optional: a session works entirely in memory without one. The store
//! keys each serialized forest by the digest of its full
//! training-parameter tuple, so a parameter change can never resurrect
//! a stale model.

use std::fs;
use std::path::PathBuf;

use benthos_algorithms::forest::RandomForest;

use crate::error::{PipelineError, Result};

/// A directory of serialized models.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open (creating if needed) a store at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PipelineError::Store(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, digest: u64) -> PathBuf {
        self.dir.join(format!("forest-{digest:016x}.json"))
    }

    /// Load the model for a parameter digest, if present.
    pub fn load(&self, digest: u64) -> Result<Option<RandomForest>> {
        let path = self.path_for(digest);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| PipelineError::Store(e.to_string()))?;
        let model = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::Store(format!("corrupt model file {path:?}: {e}")))?;
        Ok(Some(model))
    }

    /// Persist a model under a parameter digest.
    pub fn save(&self, digest: u64, model: &RandomForest) -> Result<()> {
        let bytes =
            serde_json::to_vec(model).map_err(|e| PipelineError::Store(e.to_string()))?;
        fs::write(self.path_for(digest), bytes)
            .map_err(|e| PipelineError::Store(e.to_string()))
    }
}
