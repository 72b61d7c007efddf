//! Incremental export: copy page images or metadata records of newly added
//! items into a flat directory (image server staging, search staging).
//!
//! An item is new when the second `-` token of the file name parses as an
//! integer above the threshold: `image-812-03.jpg` and `metadata-812.json`
//! both belong to item 812.

use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{ensure_directory, file_name, find_files, require_directory};
use crate::naming::export_index;
use crate::output::{StageRecorder, StageReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STAGE: &str = "export";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportKind {
    /// `*.jpg` page images.
    Images,
    /// `*.json` metadata records.
    Metadata,
}

impl ExportKind {
    fn extension(self) -> &'static str {
        match self {
            ExportKind::Images => "jpg",
            ExportKind::Metadata => "json",
        }
    }
}

/// Copy every matching file under `output_root` with item number `> start`
/// into `dest`. Returns the copied destination paths.
pub fn export_files(
    config: &PipelineConfig,
    kind: ExportKind,
    start: u64,
    dest: &Path,
) -> Result<StageReport<PathBuf>, ArchiveError> {
    require_directory(&config.output_root)?;
    ensure_directory(dest)?;

    let candidates: Vec<(PathBuf, String)> = find_files(&config.output_root, kind.extension())
        .into_iter()
        .filter_map(|path| {
            let name = file_name(&path);
            export_index(&name)
                .filter(|n| *n > start)
                .map(|_| (path, name))
        })
        .collect();

    let mut rec = StageRecorder::start(STAGE, candidates.len(), config.progress_callback.clone());
    for (source, name) in candidates {
        rec.item_start(&name);
        let target = dest.join(&name);
        match std::fs::copy(&source, &target) {
            Ok(_) => rec.complete(&name, target),
            Err(e) => rec.fail(&name, ItemError::io(&source, &e)),
        }
    }
    Ok(rec.finish())
}
