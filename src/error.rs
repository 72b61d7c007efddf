//! Error types for the scan2iiif library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ArchiveError`] is **fatal**: the stage cannot proceed at all (missing
//!   override table, unreachable search endpoint, invalid configuration).
//!   Returned as `Err(ArchiveError)` from the stage entry points.
//!
//! * [`ItemError`] is **non-fatal**: a single item failed (bad filename, a
//!   converter exited non-zero, a description file is missing) but the rest
//!   of the batch is fine. Stored inside [`crate::output::StageReport`] so
//!   callers can inspect partial success instead of losing the whole run to
//!   one bad document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2iiif library.
#[derive(Debug, Error)]
pub enum ArchiveError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Override table ────────────────────────────────────────────────────
    /// The override table is required for metadata assembly.
    #[error("Override table not found: '{path}'\nPass --override-table or set SCAN2IIIF_OVERRIDE_TABLE.")]
    OverrideTableMissing { path: PathBuf },

    /// The override table exists but could not be read.
    #[error("Failed to read override table '{path}': {source}")]
    OverrideTableRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A directory or output file could not be created or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be serialised or parsed.
    #[error("JSON error on '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Search engine ─────────────────────────────────────────────────────
    /// The search endpoint did not answer the reachability check.
    #[error("Search endpoint '{url}' is unreachable: {reason}")]
    SearchUnavailable { url: String, reason: String },

    /// Adding a document failed; the batch is abandoned without a commit.
    #[error("Failed to submit document '{id}' to the search index: {reason}")]
    SearchSubmitFailed { id: String, reason: String },

    /// The final commit failed.
    #[error("Search index commit failed: {reason}")]
    SearchCommitFailed { reason: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single item.
///
/// The surrounding batch keeps going; the error is logged and recorded in the
/// stage report.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The filename does not yield a usable identifier.
    #[error("'{name}': malformed identifier: {reason}")]
    MalformedIdentifier { name: String, reason: String },

    /// An external tool exited with a non-zero status.
    #[error("{tool} failed on '{path}': {detail}")]
    ToolFailed {
        tool: String,
        path: PathBuf,
        detail: String,
    },

    /// An external tool did not finish within the configured timeout.
    #[error("{tool} timed out after {secs}s on '{path}'")]
    ToolTimeout { tool: String, path: PathBuf, secs: u64 },

    /// A file an earlier stage should have produced is absent.
    #[error("Expected file is missing: '{path}'")]
    MissingExpectedFile { path: PathBuf },

    /// An override table row did not have the expected columns.
    #[error("Override table line {line}: {reason}")]
    MalformedOverrideRow { line: usize, reason: String },

    /// Entity extraction or another HTTP collaborator failed.
    #[error("{service} request failed: {detail}")]
    ExternalService { service: String, detail: String },

    /// Reading or writing a per-item file failed.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },
}

impl ItemError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        ItemError::Io {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

impl From<ArchiveError> for ItemError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Io { path, source } => ItemError::io(path, &source),
            ArchiveError::Json { path, source } => ItemError::Io {
                path,
                detail: source.to_string(),
            },
            other => ItemError::ExternalService {
                service: "pipeline".into(),
                detail: other.to_string(),
            },
        }
    }
}
