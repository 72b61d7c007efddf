//! Stage 2: description documents → `description-<id>.md`.

use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{ensure_directory, file_name, find_files, require_directory};
use crate::naming::ItemId;
use crate::output::{StageRecorder, StageReport};
use crate::tools::DocumentConverter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const STAGE: &str = "describe";

/// Markdown written for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribedItem {
    pub id: ItemId,
    pub source: PathBuf,
    pub markdown: PathBuf,
}

pub async fn describe_all(
    config: &PipelineConfig,
    converter: &dyn DocumentConverter,
) -> Result<StageReport<DescribedItem>, ArchiveError> {
    require_directory(&config.source_root)?;
    ensure_directory(&config.output_root)?;

    let sources = find_files(&config.source_root, "docx");
    let mut rec = StageRecorder::start(STAGE, sources.len(), config.progress_callback.clone());
    let mut seen: HashMap<ItemId, PathBuf> = HashMap::new();

    for docx in sources {
        let name = file_name(&docx);
        let id = match ItemId::from_file_name(&name) {
            Ok(id) => id,
            Err(e) => {
                rec.skip(&name, e.to_string());
                continue;
            }
        };
        if let Some(first) = seen.get(&id) {
            rec.skip(
                &name,
                format!("identifier {id} already described from '{}'", first.display()),
            );
            continue;
        }
        seen.insert(id.clone(), docx.clone());
        rec.item_start(id.as_str());

        let dir = id.item_dir(&config.output_root);
        let target = dir.join(id.description_file_name());
        if config.skip_existing && target.is_file() {
            rec.skip(id.as_str(), "description already converted");
            continue;
        }

        let result = match std::fs::create_dir_all(&dir) {
            Ok(()) => converter.convert(&docx, &target).await,
            Err(e) => Err(ItemError::io(&dir, &e)),
        };
        match result {
            Ok(()) => rec.complete(
                id.as_str(),
                DescribedItem {
                    id: id.clone(),
                    source: docx,
                    markdown: target,
                },
            ),
            Err(e) => rec.fail(id.as_str(), e),
        }
    }

    Ok(rec.finish())
}
