//! Stage 3: file name + override table + description markdown → metadata record.
//!
//! ## Precedence
//!
//! | Field | Source, first present wins |
//! |-------|----------------------------|
//! | `creator` | override creator, then `"<last>, <first>"` from the file name |
//! | `subject` | override subject, then the file-name subject token |
//! | `type` | file-name type token |
//! | `location` | override institution |
//! | `within` | `Binder<N>` in the source path |
//! | `label`, `description` | summary paragraph, then override description |
//!
//! Everything else comes from [`super::segment`].

use super::segment::{extract_contents, extract_summary, segment};
use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{file_name, find_files, require_directory};
use crate::naming::{binder_label, DescriptionName, ItemId};
use crate::output::{StageRecorder, StageReport};
use crate::overrides::{OverrideRecord, OverrideTable};
use crate::record::{MetadataRecord, StoredRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const STAGE: &str = "assemble";

pub fn assemble_all(config: &PipelineConfig) -> Result<StageReport<StoredRecord>, ArchiveError> {
    require_directory(&config.source_root)?;
    let (overrides, rejected) = OverrideTable::load(&config.override_table_path)?;

    let sources = find_files(&config.source_root, "docx");
    let mut rec = StageRecorder::start(STAGE, sources.len(), config.progress_callback.clone());
    for row_error in rejected {
        rec.warn(row_error.to_string());
    }
    let mut seen: HashMap<ItemId, PathBuf> = HashMap::new();

    for docx in sources {
        let name = file_name(&docx);
        let parsed = match DescriptionName::parse(&name) {
            Ok(parsed) => parsed,
            Err(e) => {
                rec.skip(&name, e.to_string());
                continue;
            }
        };
        let id = parsed.id.clone();
        if let Some(first) = seen.get(&id) {
            rec.skip(
                &name,
                format!("identifier {id} already assembled from '{}'", first.display()),
            );
            continue;
        }
        seen.insert(id.clone(), docx.clone());
        rec.item_start(id.as_str());

        let dir = id.item_dir(&config.output_root);
        let md_path = dir.join(id.description_file_name());
        let markdown = match std::fs::read(&md_path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                rec.warn(ItemError::MissingExpectedFile { path: md_path.clone() }.to_string());
                None
            }
            Err(e) => {
                rec.fail(id.as_str(), ItemError::io(&md_path, &e));
                continue;
            }
        };

        let relative = docx.strip_prefix(&config.source_root).unwrap_or(&docx);
        let record = build_record(&parsed, relative, overrides.get(&id), markdown.as_deref());

        let path = dir.join(id.metadata_file_name());
        match record.write(&path) {
            Ok(()) => rec.complete(id.as_str(), StoredRecord { record, path }),
            Err(e) => rec.fail(id.as_str(), e.into()),
        }
    }

    Ok(rec.finish())
}

/// Merge one item's sources into a record. Pure; no I/O.
///
/// `markdown` is `None` when the description file is missing, in which case
/// only the override description can supply a label and no text fields are
/// extracted.
pub fn build_record(
    name: &DescriptionName,
    relative_source: &Path,
    correction: Option<&OverrideRecord>,
    markdown: Option<&str>,
) -> MetadataRecord {
    let correction = correction.cloned().unwrap_or_default();

    let creator = correction
        .creator
        .or_else(|| name.creator())
        .unwrap_or_default();
    let subject = correction.subject.or_else(|| name.subject.clone());
    let label = markdown
        .and_then(extract_summary)
        .or(correction.description)
        .unwrap_or_default();

    let mut record = MetadataRecord {
        id: name.id.record_id(),
        creator,
        subject,
        kind: name.kind.clone(),
        location: correction.institution,
        within: binder_label(relative_source),
        description: label.clone(),
        label,
        ..Default::default()
    };

    if let Some(markdown) = markdown {
        let sections = segment(markdown).render();
        record.contents = extract_contents(markdown);
        record.recto = sections.recto;
        record.verso = sections.verso;
        record.photo = sections.photo;
        record.institutional_stamp = sections.institutional_stamp;
    }
    record
}
