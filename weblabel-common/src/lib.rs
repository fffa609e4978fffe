//! # weblabel common library
//!
//! Shared code for the weblabel backend:
//! - File-backed label store (discovery, loading, label persistence)
//! - NPY sample array codec
//! - Label segment model and normalization
//! - Filter preset document
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod labels;
pub mod npy;
pub mod presets;
pub mod store;

pub use error::{Error, Result};
pub use labels::{LabelConfig, Segment, UNLABELED};
pub use presets::PresetStore;
pub use store::{DiscoveryOptions, FileRecord, FsLabelStore, LabelStore, LoadedFile};
