//! Filter preset document
//!
//! The frontend keeps its signal filter presets in one JSON array stored next
//! to the signal directories. Preset objects are opaque here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::store::write_json_atomic;
use crate::{Error, Result};

/// File name of the preset document under the discovery root
pub const PRESETS_FILE: &str = "filter_presets.json";

/// Reads and writes `filter_presets.json`
#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    /// Preset store for the discovery root `root`
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(PRESETS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved presets, or an empty list when nothing was saved yet.
    pub fn load(&self) -> Result<Vec<Value>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No preset file at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(Error::ConfigIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|e| Error::MalformedConfig {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Replace the saved presets.
    pub fn save(&self, presets: &[Value]) -> Result<()> {
        write_json_atomic(&self.path, presets, true).map_err(|source| Error::ConfigIo {
            path: self.path.clone(),
            source,
        })
    }
}
