//! Stage 6: handwritten-notebook transcripts.
//!
//! Two steps: [`convert_notebooks`] turns the transcript documents into
//! markdown, [`index_notebooks`] submits every `entry*.md` as one full-text
//! search document and commits once.

use super::index::rfc3339;
use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use crate::fsutil::{ensure_directory, file_name, file_stem, find_files, list_dir, require_directory};
use crate::naming::NotebookName;
use crate::output::{StageRecorder, StageReport};
use crate::search::{SearchClient, SearchDocument};
use crate::tools::DocumentConverter;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

pub const CONVERT_STAGE: &str = "notebook-convert";
pub const INDEX_STAGE: &str = "notebook-index";

static RE_THREE_SPACE_INDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^   ").unwrap());

/// Convert every `*.docx` under `notebook_source_root` to
/// `notebook_markdown_root/<basename>.md`.
pub async fn convert_notebooks(
    config: &PipelineConfig,
    converter: &dyn DocumentConverter,
) -> Result<StageReport<PathBuf>, ArchiveError> {
    require_directory(&config.notebook_source_root)?;
    ensure_directory(&config.notebook_markdown_root)?;

    let sources = find_files(&config.notebook_source_root, "docx");
    let mut rec =
        StageRecorder::start(CONVERT_STAGE, sources.len(), config.progress_callback.clone());

    for docx in sources {
        let name = file_name(&docx);
        if name.starts_with('~') {
            rec.skip(&name, "editor lock file");
            continue;
        }
        rec.item_start(&name);
        let target = config
            .notebook_markdown_root
            .join(format!("{}.md", file_stem(&docx)));
        if config.skip_existing && target.is_file() {
            rec.skip(&name, "transcript already converted");
            continue;
        }
        match converter.convert(&docx, &target).await {
            Ok(()) => rec.complete(&name, target),
            Err(e) => rec.fail(&name, e),
        }
    }
    Ok(rec.finish())
}

/// Index every `entry*.md` in `notebook_markdown_root`. Returns submitted ids.
pub async fn index_notebooks(
    config: &PipelineConfig,
    search: &dyn SearchClient,
    now: DateTime<Utc>,
) -> Result<StageReport<String>, ArchiveError> {
    search.ping().await?;

    let transcripts: Vec<PathBuf> = list_dir(&config.notebook_markdown_root, "md")?
        .into_iter()
        .filter(|p| file_name(p).starts_with("entry"))
        .collect();
    let timestamp = rfc3339(now);
    let mut rec =
        StageRecorder::start(INDEX_STAGE, transcripts.len(), config.progress_callback.clone());

    for path in transcripts {
        let name = file_name(&path);
        let parsed = match NotebookName::parse(&name) {
            Ok(parsed) => parsed,
            Err(e) => {
                rec.skip(&name, e.to_string());
                continue;
            }
        };
        rec.item_start(&name);

        let transcript = match std::fs::read(&path) {
            Ok(bytes) => normalise_transcript(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                rec.fail(&name, ItemError::io(&path, &e));
                continue;
            }
        };
        let length = transcript.chars().count();
        if length > config.notebook_length_warning {
            rec.warn(format!(
                "{name}: transcript is {length} characters, over the {} character limit",
                config.notebook_length_warning
            ));
        }

        let document = notebook_document(config, &parsed, transcript, &timestamp);
        search.add(&document).await?;
        rec.complete(&name, document.id);
    }

    search.commit().await?;
    Ok(rec.finish())
}

/// Pandoc indents wrapped lines by three spaces, which markdown renderers
/// read as a code block at list depth; two spaces keep them as text.
pub fn normalise_transcript(markdown: &str) -> String {
    RE_THREE_SPACE_INDENT.replace_all(markdown, "  ").into_owned()
}

/// Map a transcript onto the search schema. Pure; no I/O.
pub fn notebook_document(
    config: &PipelineConfig,
    name: &NotebookName,
    transcript: String,
    timestamp: &str,
) -> SearchDocument {
    let label = name.label();
    let within = name.within();
    let author = Some(config.notebook_author.clone());
    let location = Some(config.notebook_location.clone());
    SearchDocument {
        id: name.id(),
        title_display: label.clone(),
        title_t: label,
        text: transcript.clone(),
        subject_topic_facet: name.subject.clone(),
        subject_topic_s: name.subject.clone(),
        author_display: author.clone(),
        author_t: author.clone(),
        author_unstem_search: author.clone(),
        author_display_facet: author,
        part_of_facet: Some(within.clone()),
        part_of_s: Some(within),
        location_facet: location.clone(),
        location_s: location,
        fulltext_s: Some(transcript),
        format: "text".to_string(),
        timestamp: timestamp.to_string(),
        ..Default::default()
    }
}
