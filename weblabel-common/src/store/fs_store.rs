//! Directory-backed label store
//!
//! Layout under the discovery root:
//!
//! ```text
//! <root>/<id>/x.npy          primary samples (required for discovery)
//! <root>/<id>/p0.npy ...     auxiliary vectors, contiguous from p0
//! <root>/<id>/yconfig.json   label config (created on first update)
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{aux_file_name, FileRecord, LabelStore, LABEL_CONFIG_FILE, SAMPLES_FILE};
use crate::{Error, Result};

/// Discovery behavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// When set, every file expects exactly this many auxiliary vectors
    /// (`p0..p{n-1}`); missing ones fail the load. When unset, whatever
    /// contiguous `p*.npy` files exist at discovery time are used.
    pub expected_aux_vectors: Option<usize>,
}

/// Label store over an immutable index built by one directory scan
#[derive(Debug)]
pub struct FsLabelStore {
    root: PathBuf,
    files: BTreeMap<String, FileRecord>,
}

impl FsLabelStore {
    /// Scan `root` once and freeze the resulting index.
    ///
    /// Every immediate sub-directory holding an `x.npy` becomes one file,
    /// identified by the directory name.
    pub fn discover(root: impl Into<PathBuf>, options: DiscoveryOptions) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Discovery root is not a directory: {}",
                root.display()
            )));
        }

        let mut files = BTreeMap::new();
        for entry in fs::read_dir(&root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            let dir = entry.path();
            let samples = dir.join(SAMPLES_FILE);
            if !dir.is_dir() || !samples.is_file() {
                debug!("Skipping {} (no {})", dir.display(), SAMPLES_FILE);
                continue;
            }

            let Some(id) = entry.file_name().to_str().map(str::to_owned) else {
                warn!("Skipping {} (name is not valid UTF-8)", dir.display());
                continue;
            };

            let aux = collect_aux(&dir, options.expected_aux_vectors);
            debug!("Discovered {} with {} auxiliary vector(s)", id, aux.len());

            files.insert(
                id.clone(),
                FileRecord {
                    id,
                    samples,
                    aux,
                    label_config: dir.join(LABEL_CONFIG_FILE),
                },
            );
        }

        info!("Discovered {} signal file(s) under {}", files.len(), root.display());

        Ok(Self { root, files })
    }

    /// Discovery root this index was built from
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn collect_aux(dir: &Path, expected: Option<usize>) -> Vec<PathBuf> {
    match expected {
        Some(count) => (0..count).map(|i| dir.join(aux_file_name(i))).collect(),
        None => (0..)
            .map(|i| dir.join(aux_file_name(i)))
            .take_while(|path| path.is_file())
            .collect(),
    }
}

impl LabelStore for FsLabelStore {
    fn list_files(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn locate(&self, id: &str) -> Result<&FileRecord> {
        self.files
            .get(id)
            .ok_or_else(|| Error::UnknownIdentifier(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn collects_contiguous_aux_vectors() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("p0.npy"));
        touch(&dir.path().join("p1.npy"));
        touch(&dir.path().join("p3.npy"));

        let aux = collect_aux(dir.path(), None);
        assert_eq!(
            aux,
            vec![dir.path().join("p0.npy"), dir.path().join("p1.npy")]
        );
    }

    #[test]
    fn expected_aux_vectors_are_listed_even_when_absent() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("p0.npy"));

        let aux = collect_aux(dir.path(), Some(2));
        assert_eq!(aux.len(), 2);
        assert_eq!(aux[1], dir.path().join("p1.npy"));
    }

    #[test]
    fn discover_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = FsLabelStore::discover(dir.path().join("nope"), DiscoveryOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
