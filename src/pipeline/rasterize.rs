//! Stage 1: scan PDFs → per-item page images.
//!
//! Every `*.pdf` under `source_root` becomes `output_root/<id>/image-<id>-NN.jpg`.
//! Stale page images of the item are purged first so a re-scan with fewer
//! pages never leaves orphans from the previous run behind.

use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{ensure_directory, file_name, find_files, require_directory};
use crate::naming::ItemId;
use crate::output::{StageRecorder, StageReport};
use crate::tools::{existing_page_images, RasterizeTool};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STAGE: &str = "rasterize";

/// Page images produced for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterizedItem {
    pub id: ItemId,
    pub source: PathBuf,
    pub images: Vec<PathBuf>,
}

pub async fn rasterize_all(
    config: &PipelineConfig,
    tool: &dyn RasterizeTool,
) -> Result<StageReport<RasterizedItem>, ArchiveError> {
    require_directory(&config.source_root)?;
    ensure_directory(&config.output_root)?;

    let sources = find_files(&config.source_root, "pdf");
    let mut rec = StageRecorder::start(STAGE, sources.len(), config.progress_callback.clone());
    let mut seen: HashMap<ItemId, PathBuf> = HashMap::new();

    for pdf in sources {
        let name = file_name(&pdf);
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
                format!("identifier {id} already rasterised from '{}'", first.display()),
            );
            continue;
        }
        seen.insert(id.clone(), pdf.clone());

        rec.item_start(id.as_str());
        let dir = id.item_dir(&config.output_root);
        if config.skip_existing && !existing_page_images(&dir, &id).is_empty() {
            rec.skip(id.as_str(), "page images already present");
            continue;
        }

        match rasterize_one(tool, &pdf, &dir, &id).await {
            Ok(images) => rec.complete(
                id.as_str(),
                RasterizedItem {
                    id: id.clone(),
                    source: pdf,
                    images,
                },
            ),
            Err(e) => rec.fail(id.as_str(), e),
        }
    }

    Ok(rec.finish())
}

async fn rasterize_one(
    tool: &dyn RasterizeTool,
    pdf: &Path,
    dir: &Path,
    id: &ItemId,
) -> Result<Vec<PathBuf>, ItemError> {
    std::fs::create_dir_all(dir).map_err(|e| ItemError::io(dir, &e))?;
    let purged = purge_page_images(dir, id)?;
    if purged > 0 {
        debug!(id = %id, purged, "removed stale page images");
    }
    tool.rasterize(pdf, dir, id).await
}

/// Delete every `image-<id>-*.jpg` in `dir`, returning how many were removed.
pub fn purge_page_images(dir: &Path, id: &ItemId) -> Result<usize, ItemError> {
    let stale = existing_page_images(dir, id);
    for path in &stale {
        std::fs::remove_file(path).map_err(|e| ItemError::io(path, &e))?;
    }
    Ok(stale.len())
}
