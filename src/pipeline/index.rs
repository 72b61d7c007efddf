//! Stage 5: metadata records → search documents.
//!
//! The endpoint is pinged before anything is built. Documents are added one
//! by one and committed once at the end; a failed add abandons the batch
//! without committing, leaving earlier adds uncommitted for the operator to
//! re-run. Entity extraction is best-effort: a failure is a warning and the
//! document goes in without `gnrd_sm`.

use super::manifest::discover_records;
use crate::config::PipelineConfig;
use crate::error::ArchiveError;
use crate::fsutil::file_name;
use crate::output::{StageRecorder, StageReport};
use crate::record::{MetadataRecord, StoredRecord};
use crate::search::{EntityExtractor, SearchClient, SearchDocument};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::PathBuf;

pub const STAGE: &str = "index";

/// Index `records`, or every `metadata-*.json` under `output_root` when none
/// are handed over. Returns the ids of submitted documents.
pub async fn index_records(
    config: &PipelineConfig,
    records: Option<&[StoredRecord]>,
    search: &dyn SearchClient,
    entities: &dyn EntityExtractor,
    now: DateTime<Utc>,
) -> Result<StageReport<String>, ArchiveError> {
    search.ping().await?;

    let paths: Vec<PathBuf> = match records {
        Some(records) => records.iter().map(|r| r.path.clone()).collect(),
        None => discover_records(&config.output_root)?,
    };
    let timestamp = rfc3339(now);
    let mut rec = StageRecorder::start(STAGE, paths.len(), config.progress_callback.clone());

    for (idx, path) in paths.iter().enumerate() {
        let item = file_name(path);
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
        rec.item_start(&record.id);

        let names = if record.label.trim().is_empty() {
            None
        } else {
            match entities.find_names(&record.label).await {
                Ok(names) => Some(names),
                Err(e) => {
                    rec.warn(format!("{}: entity extraction failed: {e}", record.id));
                    None
                }
            }
        };

        let document = scan_document(config, &record, names, &timestamp);
        search.add(&document).await?;
        rec.complete(&record.id, document.id);
    }

    search.commit().await?;
    Ok(rec.finish())
}

/// Map a record onto the search schema. Pure; no I/O.
pub fn scan_document(
    config: &PipelineConfig,
    record: &MetadataRecord,
    names: Option<Vec<String>>,
    timestamp: &str,
) -> SearchDocument {
    let creator = (!record.creator.is_empty()).then(|| record.creator.clone());
    SearchDocument {
        id: record.id.clone(),
        title_display: record.label.clone(),
        title_t: record.label.clone(),
        text: format!(
            "{} {} {}",
            record.label,
            record.recto.as_deref().unwrap_or_default(),
            record.verso.as_deref().unwrap_or_default()
        ),
        subject_topic_facet: record.subject.clone(),
        subject_topic_s: record.subject.clone(),
        gnrd_sm: names,
        author_display: creator.clone(),
        author_t: creator.clone(),
        author_unstem_search: creator.clone(),
        author_display_facet: creator,
        iiif_manifest_s: Some(format!("{}/{}.json", config.manifest_base_url(), record.id)),
        iiif_thumbnail_s: Some(thumbnail_url(&config.url_prefix, &record.id)),
        part_of_facet: record.within.clone(),
        part_of_s: record.within.clone(),
        location_facet: record.location.clone(),
        location_s: record.location.clone(),
        contents_s: record.contents.clone(),
        recto_s: record.recto.clone(),
        verso_s: record.verso.clone(),
        photo_s: record.photo.clone(),
        institutional_stamp_s: record.institutional_stamp.clone(),
        fulltext_s: None,
        format: "scan".to_string(),
        object_type_s: Some("scan".to_string()),
        timestamp: timestamp.to_string(),
    }
}

/// First-page thumbnail: `scan-42` → `<prefix>/image-service/image-42-00/full/150,150/0/default.jpg`.
pub fn thumbnail_url(url_prefix: &str, record_id: &str) -> String {
    let image_id = record_id.replacen("scan", "image", 1);
    format!("{url_prefix}/image-service/{image_id}-00/full/150,150/0/default.jpg")
}

pub(crate) fn rfc3339(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}
