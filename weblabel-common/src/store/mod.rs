//! File-backed label store
//!
//! The store is the only owner of the signal files on disk. It is built from
//! a one-time scan of the discovery root (see [`FsLabelStore::discover`]); the
//! resulting index is immutable, so files added later require a restart.
//!
//! Handlers depend on the [`LabelStore`] trait rather than the directory
//! implementation.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::labels::{LabelConfig, StoredLabelConfig};
use crate::npy::{self, SampleArray};
use crate::{Error, Result};

mod fs_store;

pub use fs_store::{DiscoveryOptions, FsLabelStore};

/// Name of the primary sample array inside a file directory
pub const SAMPLES_FILE: &str = "x.npy";

/// Name of the label configuration inside a file directory
pub const LABEL_CONFIG_FILE: &str = "yconfig.json";

/// File name of auxiliary vector `index` (`p0.npy`, `p1.npy`, ...)
pub fn aux_file_name(index: usize) -> String {
    format!("p{index}.npy")
}

/// Locations of one discovered signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Identifier (name of the containing directory)
    pub id: String,
    /// Primary sample array
    pub samples: PathBuf,
    /// Auxiliary vectors in index order
    pub aux: Vec<PathBuf>,
    /// Label configuration; may not exist yet
    pub label_config: PathBuf,
}

/// Fully materialized contents of one signal
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFile {
    pub samples: SampleArray,
    pub aux: Vec<Vec<f64>>,
    pub label_config: LabelConfig,
}

/// Repository of labeled signal files
///
/// Implementors provide the index (`list_files`, `locate`); loading and label
/// persistence have default implementations over the located paths.
pub trait LabelStore: Send + Sync {
    /// Identifiers of every known file.
    fn list_files(&self) -> Vec<String>;

    /// Locations backing `id`, or [`Error::UnknownIdentifier`].
    fn locate(&self, id: &str) -> Result<&FileRecord>;

    /// Load samples, auxiliary vectors and the normalized label config.
    fn load_file(&self, id: &str) -> Result<LoadedFile> {
        let record = self.locate(id)?;
        let samples = npy::read(&record.samples)?;

        let mut aux = Vec::with_capacity(record.aux.len());
        for path in &record.aux {
            let array = match npy::read(path) {
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::MissingAuxiliaryData {
                        id: record.id.clone(),
                        path: path.clone(),
                    })
                }
                other => other?,
            };
            aux.push(array.data.to_f64_vec());
        }

        let label_config = self.get_label_config(id, samples.len() as u64)?;

        Ok(LoadedFile {
            samples,
            aux,
            label_config,
        })
    }

    /// Persisted label config for `id`, or a single unlabeled segment over
    /// `sample_count` samples when none was saved yet. Always normalized.
    fn get_label_config(&self, id: &str, sample_count: u64) -> Result<LabelConfig> {
        let path = &self.locate(id)?.label_config;

        let config = match fs::read_to_string(path) {
            Ok(text) => StoredLabelConfig::parse(&text, path)?.migrate(path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => LabelConfig::unlabeled(sample_count),
            Err(source) => {
                return Err(Error::ConfigIo {
                    path: path.clone(),
                    source,
                })
            }
        };

        Ok(config.normalize())
    }

    /// Replace the persisted label config for `id` with `config`, verbatim.
    ///
    /// Last writer wins: concurrent updates to the same file are not
    /// coordinated. Every writer stages its own temp file and renames it into
    /// place, so readers see either the previous or the new document in full.
    fn set_label_config(&self, id: &str, config: &LabelConfig) -> Result<()> {
        let path = &self.locate(id)?.label_config;
        write_json_atomic(path, config, false).map_err(|source| Error::ConfigIo {
            path: path.clone(),
            source,
        })
    }
}

/// Serialize `value` to a fresh temp file next to `path`, then rename it over
/// `path`.
///
/// Each call gets its own uniquely named temp file, so overlapping writers
/// never share a partial document. The temp file is removed if any step fails.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = match path.file_name() {
        Some(name) => format!(".{}.", name.to_string_lossy()),
        None => ".weblabel.".to_string(),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(&mut tmp);
        if pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
