//! The normalised per-item metadata record, `metadata-<id>.json`.

use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One item's metadata.
///
/// Optional fields are skipped when `None`: downstream consumers test for key
/// presence, so an absent verso must be an absent key, not `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// `scan-<identifier>`
    pub id: String,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Binder or volume label, e.g. `Binder 9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,
    /// Short description as an HTML fragment.
    pub label: String,
    /// Same value as `label`.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recto: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutional_stamp: Option<String>,
}

impl MetadataRecord {
    /// Present fields other than `id`, `label` and `description`, in
    /// serialisation order, as `(field name, value)` pairs.
    pub fn display_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("creator", self.creator.as_str())];
        let optional = [
            ("subject", &self.subject),
            ("type", &self.kind),
            ("location", &self.location),
            ("within", &self.within),
            ("contents", &self.contents),
            ("recto", &self.recto),
            ("verso", &self.verso),
            ("photo", &self.photo),
            ("institutional_stamp", &self.institutional_stamp),
        ];
        fields.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| value.as_deref().map(|v| (name, v))),
        );
        fields
    }

    pub fn read(path: &Path) -> Result<Self, ArchiveError> {
        let raw = std::fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|source| ArchiveError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Pretty JSON, written atomically (temp file + rename).
    pub fn write(&self, path: &Path) -> Result<(), ArchiveError> {
        crate::fsutil::write_json_pretty(path, self)
    }
}

/// A record together with where it lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: MetadataRecord,
    pub path: PathBuf,
}
