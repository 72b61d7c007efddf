//! Stage 4: metadata record + page images → IIIF manifest.
//!
//! The manifest is a pure projection of the record, the sorted page list and
//! the URL prefix. Nothing time- or run-dependent goes into it, so
//! regenerating from unchanged inputs yields byte-identical files.

use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{ensure_directory, file_name, file_stem, find_files, list_dir, write_json_pretty};
use crate::iiif::{capitalize_label, Canvas, Manifest, MetadataEntry};
use crate::naming::{manifest_file_name, page_index};
use crate::output::{StageRecorder, StageReport};
use crate::record::{MetadataRecord, StoredRecord};
use crate::tools::ImageProbe;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const STAGE: &str = "manifest";

/// A scanned page ready to become a canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub basename: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenManifest {
    pub record_id: String,
    pub path: PathBuf,
    pub canvases: usize,
}

/// Build manifests for `records`, or for every `metadata-*.json` under
/// `output_root` when no records are handed over.
pub async fn build_manifests(
    config: &PipelineConfig,
    records: Option<&[StoredRecord]>,
    probe: &dyn ImageProbe,
) -> Result<StageReport<WrittenManifest>, ArchiveError> {
    ensure_directory(&config.manifest_root)?;
    let paths: Vec<PathBuf> = match records {
        Some(records) => records.iter().map(|r| r.path.clone()).collect(),
        None => discover_records(&config.output_root)?,
    };

    let mut rec = StageRecorder::start(STAGE, paths.len(), config.progress_callback.clone());
    for (idx, path) in paths.iter().enumerate() {
        let item = file_name(path);
        rec.item_start(&item);

        // Records handed over in-process are used as-is; discovered ones are read.
        let record = match records {
            Some(records) => records[idx].record.clone(),
            None => match MetadataRecord::read(path) {
                Ok(record) => record,
                Err(e) => {
                    rec.fail(&item, e.into());
                    continue;
                }
            },
        };

        let dir = path.parent().unwrap_or(Path::new("."));
        let pages = match collect_pages(dir, probe, &mut rec).await {
            Ok(pages) => pages,
            Err(e) => {
                rec.fail(&item, e);
                continue;
            }
        };

        let manifest = build_manifest(&config.url_prefix, &record, &pages);
        let target = config.manifest_root.join(manifest_file_name(&item));
        match write_json_pretty(&target, &manifest) {
            Ok(()) => rec.complete(
                &item,
                WrittenManifest {
                    record_id: record.id.clone(),
                    path: target,
                    canvases: pages.len(),
                },
            ),
            Err(e) => rec.fail(&item, e.into()),
        }
    }
    Ok(rec.finish())
}

/// Every `metadata-*.json` under `root`, sorted.
pub fn discover_records(root: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    crate::fsutil::require_directory(root)?;
    Ok(find_files(root, "json")
        .into_iter()
        .filter(|p| file_name(p).starts_with("metadata-"))
        .collect())
}

/// Page images beside a record, ordered by numeric page index then name.
///
/// JPEGs without a trailing `-<digits>` are not pages; they are reported as
/// warnings and left out. Any probe failure fails the whole item so a
/// manifest is never written with a missing page.
async fn collect_pages<T>(
    dir: &Path,
    probe: &dyn ImageProbe,
    rec: &mut StageRecorder<T>,
) -> Result<Vec<PageImage>, ItemError> {
    let images = list_dir(dir, "jpg").map_err(ItemError::from)?;

    let mut indexed: Vec<(u32, String, &PathBuf)> = Vec::with_capacity(images.len());
    for image in &images {
        let stem = file_stem(image);
        match page_index(&stem) {
            Some(index) => indexed.push((index, stem, image)),
            None => rec.warn(format!(
                "'{}' has no page index; not added to the manifest",
                image.display()
            )),
        }
    }
    indexed.sort();

    let mut pages = Vec::with_capacity(indexed.len());
    for (_, basename, path) in indexed {
        let (width, height) = probe.dimensions(path).await?;
        pages.push(PageImage {
            basename,
            width,
            height,
        });
    }
    Ok(pages)
}

/// Assemble the manifest document. Pure; no I/O.
pub fn build_manifest(url_prefix: &str, record: &MetadataRecord, pages: &[PageImage]) -> Manifest {
    let mut manifest = Manifest::new(url_prefix, &record.id, &record.label, &record.description);
    manifest.metadata = record
        .display_fields()
        .into_iter()
        .map(|(field, value)| MetadataEntry {
            label: capitalize_label(field),
            value: value.to_string(),
        })
        .collect();
    if let Some(sequence) = manifest.sequences.first_mut() {
        sequence.canvases = pages
            .iter()
            .map(|p| Canvas::for_image(url_prefix, &p.basename, p.width, p.height))
            .collect();
    }
    manifest
}
