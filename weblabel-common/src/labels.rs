//! Label segment model and normalization
//!
//! A label configuration partitions the sample index range `[0, N)` into
//! consecutive segments. Each segment carries its exclusive upper bound and an
//! integer category; `-1` marks an unlabeled range.
//!
//! # On-disk shape
//!
//! The canonical document is a flat segment list:
//!
//! ```json
//! [{"upper_bound": 40, "label": 0}, {"upper_bound": 100, "label": 1}]
//! ```
//!
//! Older labeler versions wrote parallel-array tracks
//! (`[{"ubs": [...], "labels": [...]}, ...]`). Those are recognized by
//! [`StoredLabelConfig`] and migrated to segments on read; writes always use
//! the canonical shape.
//!
//! Migration is lossy. Only the first legacy track becomes the segment list.
//! Older versions always kept at least two tracks, so any labels on the second
//! and later tracks are gone once the migrated config is saved back. A warning
//! names the file whenever a dropped track carried assigned labels.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::{Error, Result};

/// Category value meaning "no label assigned"
pub const UNLABELED: i64 = -1;

/// One labeled sub-range of a sample sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Exclusive end index of the segment
    pub upper_bound: u64,
    /// Category; `None` is accepted from clients and coerced to [`UNLABELED`]
    #[serde(default)]
    pub label: Option<i64>,
}

impl Segment {
    pub fn new(upper_bound: u64, label: i64) -> Self {
        Self {
            upper_bound,
            label: Some(label),
        }
    }

    pub fn unlabeled(upper_bound: u64) -> Self {
        Self::new(upper_bound, UNLABELED)
    }
}

/// Ordered sequence of segments covering a sample sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelConfig {
    pub segments: Vec<Segment>,
}

impl LabelConfig {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Config for a file nobody has labeled yet: one unlabeled segment
    pub fn unlabeled(sample_count: u64) -> Self {
        Self::new(vec![Segment::unlabeled(sample_count)])
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Normalize for the frontend.
    ///
    /// - A single segment gets a coincident unlabeled companion so the UI
    ///   always has two boundary handles to split.
    /// - Null labels become [`UNLABELED`].
    ///
    /// Applying this twice yields the same result as applying it once.
    pub fn normalize(mut self) -> Self {
        if self.segments.len() == 1 {
            let upper_bound = self.segments[0].upper_bound;
            self.segments.push(Segment::unlabeled(upper_bound));
        }

        for segment in &mut self.segments {
            if segment.label.is_none() {
                segment.label = Some(UNLABELED);
            }
        }

        self
    }
}

impl From<Vec<Segment>> for LabelConfig {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

/// Parallel-array track written by older labeler versions
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyTrack {
    pub ubs: Vec<u64>,
    pub labels: Vec<Option<i64>>,
}

impl LegacyTrack {
    fn has_assigned_labels(&self) -> bool {
        self.labels
            .iter()
            .any(|label| matches!(label, Some(l) if *l != UNLABELED))
    }
}

/// Every label document shape found on disk
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoredLabelConfig {
    Segments(Vec<Segment>),
    Legacy(Vec<LegacyTrack>),
}

impl StoredLabelConfig {
    /// Parse a persisted document. `path` is only used for error reporting.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Convert to the canonical segment list.
    ///
    /// A legacy document maps its first track to segments. Further tracks have
    /// no canonical counterpart and are dropped; see [`Migration`].
    ///
    /// Fails with a reason when the first legacy track's arrays differ in
    /// length.
    pub fn into_canonical(self) -> std::result::Result<Migration, String> {
        let tracks = match self {
            StoredLabelConfig::Segments(segments) => {
                return Ok(Migration {
                    config: LabelConfig::new(segments),
                    dropped_tracks: 0,
                })
            }
            StoredLabelConfig::Legacy(tracks) => tracks,
        };

        let mut tracks = tracks.into_iter();
        let Some(first) = tracks.next() else {
            return Ok(Migration::default());
        };

        if first.ubs.len() != first.labels.len() {
            return Err(format!(
                "legacy track has {} bounds but {} labels",
                first.ubs.len(),
                first.labels.len()
            ));
        }

        let dropped_tracks = tracks.filter(LegacyTrack::has_assigned_labels).count();
        let segments = first
            .ubs
            .into_iter()
            .zip(first.labels)
            .map(|(upper_bound, label)| Segment { upper_bound, label })
            .collect();

        Ok(Migration {
            config: LabelConfig::new(segments),
            dropped_tracks,
        })
    }

    /// [`into_canonical`](Self::into_canonical) for a persisted document at
    /// `path`, logging dropped tracks.
    pub fn migrate(self, path: &Path) -> Result<LabelConfig> {
        let migration = self.into_canonical().map_err(|reason| Error::MalformedConfig {
            path: path.to_path_buf(),
            reason,
        })?;

        if migration.dropped_tracks > 0 {
            warn!(
                "Dropping {} labeled legacy track(s) from {} during migration",
                migration.dropped_tracks,
                path.display()
            );
        }
        Ok(migration.config)
    }
}

/// Result of converting a stored document to the canonical shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Migration {
    pub config: LabelConfig,
    /// Legacy tracks past the first that carried assigned labels
    pub dropped_tracks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn seg(upper_bound: u64, label: Option<i64>) -> Segment {
        Segment { upper_bound, label }
    }

    #[test]
    fn single_segment_is_expanded() {
        let config = LabelConfig::new(vec![seg(100, Some(3))]).normalize();
        assert_eq!(config.segments, vec![seg(100, Some(3)), seg(100, Some(-1))]);
    }

    #[test]
    fn single_null_segment_is_expanded_and_coerced() {
        let config = LabelConfig::new(vec![seg(7, None)]).normalize();
        assert_eq!(config.segments, vec![seg(7, Some(-1)), seg(7, Some(-1))]);
    }

    #[test]
    fn null_labels_become_unlabeled() {
        let config = LabelConfig::new(vec![seg(10, Some(2)), seg(20, None), seg(30, Some(0))])
            .normalize();
        assert_eq!(
            config.segments,
            vec![seg(10, Some(2)), seg(20, Some(-1)), seg(30, Some(0))]
        );
    }

    #[test]
    fn multi_segment_length_is_preserved() {
        let input = LabelConfig::new(vec![seg(40, Some(0)), seg(100, Some(1))]);
        assert_eq!(input.clone().normalize(), input);
    }

    #[test]
    fn empty_config_stays_empty() {
        assert!(LabelConfig::default().normalize().is_empty());
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = vec![
            LabelConfig::default(),
            LabelConfig::unlabeled(100),
            LabelConfig::new(vec![seg(5, None)]),
            LabelConfig::new(vec![seg(5, None), seg(9, Some(4)), seg(12, None)]),
        ];

        for input in inputs {
            let once = input.clone().normalize();
            let twice = once.clone().normalize();
            assert_eq!(once, twice, "normalize not idempotent for {:?}", input);
        }
    }

    #[test]
    fn serializes_as_flat_segment_list() {
        let config = LabelConfig::new(vec![seg(40, Some(0)), seg(100, Some(-1))]);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"upper_bound": 40, "label": 0},
                {"upper_bound": 100, "label": -1}
            ])
        );
    }

    #[test]
    fn missing_label_field_deserializes_as_null() {
        let config: LabelConfig = serde_json::from_str(r#"[{"upper_bound": 12}]"#).unwrap();
        assert_eq!(config.segments, vec![seg(12, None)]);
    }

    #[test]
    fn parses_canonical_document() {
        let path = PathBuf::from("yconfig.json");
        let stored = StoredLabelConfig::parse(
            r#"[{"upper_bound": 40, "label": 0}, {"upper_bound": 100, "label": null}]"#,
            &path,
        )
        .unwrap();

        let config = stored.migrate(&path).unwrap();
        assert_eq!(config.segments, vec![seg(40, Some(0)), seg(100, None)]);
    }

    #[test]
    fn migrates_legacy_first_track() {
        let path = PathBuf::from("yconfig.json");
        let stored = StoredLabelConfig::parse(
            r#"[{"ubs": [30, 80], "labels": [2, null]}, {"ubs": [80], "labels": [-1]}]"#,
            &path,
        )
        .unwrap();
        assert!(matches!(stored, StoredLabelConfig::Legacy(_)));

        let config = stored.migrate(&path).unwrap();
        assert_eq!(config.segments, vec![seg(30, Some(2)), seg(80, None)]);
    }

    #[test]
    fn counts_labeled_tracks_dropped_by_migration() {
        let stored: StoredLabelConfig = serde_json::from_str(
            r#"[{"ubs": [50], "labels": [1]}, {"ubs": [50], "labels": [-1]}, {"ubs": [50], "labels": [4]}]"#,
        )
        .unwrap();

        let migration = stored.into_canonical().unwrap();
        assert_eq!(migration.config.segments, vec![seg(50, Some(1))]);
        assert_eq!(migration.dropped_tracks, 1);
    }

    #[test]
    fn legacy_track_with_mismatched_arrays_is_malformed() {
        let path = PathBuf::from("yconfig.json");
        let stored =
            StoredLabelConfig::parse(r#"[{"ubs": [30, 80], "labels": [2]}]"#, &path).unwrap();

        let err = stored.migrate(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { .. }));
    }

    #[test]
    fn unrecognized_shape_is_malformed() {
        let path = PathBuf::from("yconfig.json");
        let err = StoredLabelConfig::parse(r#"{"segments": []}"#, &path).unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { .. }));
    }
}
