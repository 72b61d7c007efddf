//! Stage-level integration tests.
//!
//! Every external collaborator (rasteriser, document converter, dimension
//! probe, search engine, name finder) is replaced by an in-memory fake, so
//! these run anywhere without ImageMagick, pandoc, Solr or network access.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use scan2iiif::pipeline::{assemble, describe, export, index, manifest, notebook, rasterize};
use scan2iiif::{
    run_pipeline, ArchiveError, Collaborators, DocumentConverter, EntityExtractor, ExitStatus,
    ExportKind, ImageProbe, ItemError, ItemId, MetadataRecord, PipelineConfig, PipelineSteps,
    RasterizeTool, SearchClient, SearchDocument, StageProgressCallback, StoredRecord,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Writes `pages` placeholder JPEGs per item; fails for ids in `fail_ids`.
#[derive(Default)]
struct FakeRasterizer {
    pages: usize,
    fail_ids: Vec<String>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl RasterizeTool for FakeRasterizer {
    fn name(&self) -> &str {
        "fake-raster"
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
        id: &ItemId,
    ) -> Result<Vec<PathBuf>, ItemError> {
        self.calls.lock().unwrap().push(id.as_str().to_string());
        if self.fail_ids.iter().any(|f| f == id.as_str()) {
            return Err(ItemError::ToolFailed {
                tool: "fake-raster".into(),
                path: pdf.to_path_buf(),
                detail: "corrupt scan".into(),
            });
        }
        let mut written = Vec::new();
        for page in 0..self.pages {
            let path = out_dir.join(id.image_file_name(page));
            fs::write(&path, b"jpeg").unwrap();
            written.push(path);
        }
        Ok(written)
    }
}

/// Writes canned markdown keyed by input file name.
#[derive(Default)]
struct FakeConverter {
    markdown: HashMap<String, String>,
    fail_names: Vec<String>,
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    fn name(&self) -> &str {
        "fake-pandoc"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ItemError> {
        let name = input.file_name().unwrap().to_string_lossy().into_owned();
        if self.fail_names.contains(&name) {
            return Err(ItemError::ToolTimeout {
                tool: "fake-pandoc".into(),
                path: input.to_path_buf(),
                secs: 1,
            });
        }
        let body = self
            .markdown
            .get(&name)
            .cloned()
            .unwrap_or_else(|| "Untitled item.\n".to_string());
        fs::write(output, body).unwrap();
        Ok(())
    }
}

/// Fixed dimensions; fails for one file name.
struct FakeProbe {
    width: u32,
    height: u32,
    fail_on: Option<String>,
    calls: AtomicUsize,
}

impl FakeProbe {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageProbe for FakeProbe {
    async fn dimensions(&self, image: &Path) -> Result<(u32, u32), ItemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = image.file_name().unwrap().to_string_lossy();
        if self.fail_on.as_deref() == Some(name.as_ref()) {
            return Err(ItemError::ToolFailed {
                tool: "fake-identify".into(),
                path: image.to_path_buf(),
                detail: "not an image".into(),
            });
        }
        Ok((self.width, self.height))
    }
}

/// Records everything it is sent.
#[derive(Default)]
struct RecordingSearch {
    down: bool,
    reject_id: Option<String>,
    added: Mutex<Vec<SearchDocument>>,
    commits: AtomicUsize,
}

impl RecordingSearch {
    fn added(&self) -> Vec<SearchDocument> {
        self.added.lock().unwrap().clone()
    }

    fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchClient for RecordingSearch {
    async fn ping(&self) -> Result<(), ArchiveError> {
        if self.down {
            return Err(ArchiveError::SearchUnavailable {
                url: "http://fake/solr".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }

    async fn add(&self, document: &SearchDocument) -> Result<(), ArchiveError> {
        if self.reject_id.as_deref() == Some(document.id.as_str()) {
            return Err(ArchiveError::SearchSubmitFailed {
                id: document.id.clone(),
                reason: "HTTP 400".into(),
            });
        }
        self.added.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), ArchiveError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeEntities {
    names: Vec<String>,
    fail: bool,
}

#[async_trait]
impl EntityExtractor for FakeEntities {
    async fn find_names(&self, _text: &str) -> Result<Vec<String>, ItemError> {
        if self.fail {
            return Err(ItemError::ExternalService {
                service: "gnrd".into(),
                detail: "HTTP 503".into(),
            });
        }
        Ok(self.names.clone())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        for sub in ["binders", "images", "manifests", "notebooks", "notebook_markdown"] {
            fs::create_dir_all(ws.path(sub)).unwrap();
        }
        ws
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn touch(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn config(&self) -> PipelineConfig {
        self.builder().build().unwrap()
    }

    fn builder(&self) -> scan2iiif::PipelineConfigBuilder {
        PipelineConfig::builder()
            .source_root(self.path("binders"))
            .output_root(self.path("images"))
            .manifest_root(self.path("manifests"))
            .override_table_path(self.path("overrides.tsv"))
            .notebook_source_root(self.path("notebooks"))
            .notebook_markdown_root(self.path("notebook_markdown"))
            .url_prefix("http://iiif.test:3000")
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn stored(ws: &Workspace, record: MetadataRecord) -> StoredRecord {
    let number = record.id.trim_start_matches("scan-").to_string();
    let path = ws
        .path("images")
        .join(&number)
        .join(format!("metadata-{number}.json"));
    record.write(&path).unwrap();
    StoredRecord { record, path }
}

const OVERRIDES: &str = "binder\tid\tcreator\tsubject\ttype\tdescription\tinstitution\tother\n\
Binder9\t0123\tBartram, William\t\tLetter\tA corrected description\tLinnean Society\t\n\
Binder9\t77\t\t\t\t\t\t\n";

// ── Rasterize ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rasterize_isolates_a_failing_item() {
    let ws = Workspace::new();
    for id in ["1", "2", "3", "4", "5"] {
        ws.touch(&format!("binders/Binder1/{id}_scan.pdf"), b"%PDF");
    }
    let tool = FakeRasterizer {
        pages: 2,
        fail_ids: vec!["3".into()],
        ..Default::default()
    };

    let report = rasterize::rasterize_all(&ws.config(), &tool).await.unwrap();

    assert_eq!(report.produced.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item, "3");
    assert_eq!(report.exit_status(), ExitStatus::Partial);
    assert!(ws.path("images/5/image-5-01.jpg").exists());
    assert_eq!(tool.calls.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn rasterize_purges_stale_pages_and_skips_bad_names() {
    let ws = Workspace::new();
    ws.touch("binders/8_scan.pdf", b"%PDF");
    ws.touch("binders/~8_scan.pdf", b"%PDF");
    ws.touch("binders/12345_too_long.pdf", b"%PDF");
    ws.touch("images/8/image-8-05.jpg", b"old page");

    let tool = FakeRasterizer {
        pages: 1,
        ..Default::default()
    };
    let report = rasterize::rasterize_all(&ws.config(), &tool).await.unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(ws.path("images/8/image-8-00.jpg").exists());
    assert!(!ws.path("images/8/image-8-05.jpg").exists());
}

#[tokio::test]
async fn rasterize_skip_existing_leaves_pages_alone() {
    let ws = Workspace::new();
    ws.touch("binders/8_scan.pdf", b"%PDF");
    ws.touch("images/8/image-8-00.jpg", b"kept");
    let config = ws.builder().skip_existing(true).build().unwrap();

    let tool = FakeRasterizer {
        pages: 1,
        ..Default::default()
    };
    let report = rasterize::rasterize_all(&config, &tool).await.unwrap();

    assert!(report.produced.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(tool.calls.lock().unwrap().is_empty());
    assert_eq!(fs::read(ws.path("images/8/image-8-00.jpg")).unwrap(), b"kept");
}

#[tokio::test]
async fn missing_source_root_is_fatal() {
    let ws = Workspace::new();
    let config = ws
        .builder()
        .source_root(ws.path("no-such-binders"))
        .build()
        .unwrap();
    let err = rasterize::rasterize_all(&config, &FakeRasterizer::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Io { .. }));
}

// ── Describe ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn describe_writes_markdown_per_item_and_continues_past_failures() {
    let ws = Workspace::new();
    ws.touch("binders/10_Doe_Jane.docx", b"docx");
    ws.touch("binders/11_Roe_Richard.docx", b"docx");
    let converter = FakeConverter {
        markdown: HashMap::from([("10_Doe_Jane.docx".to_string(), "Ten.\n".to_string())]),
        fail_names: vec!["11_Roe_Richard.docx".into()],
    };

    let report = describe::describe_all(&ws.config(), &converter).await.unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(
        fs::read_to_string(ws.path("images/10/description-10.md")).unwrap(),
        "Ten.\n"
    );
    assert!(matches!(
        report.failed[0].error,
        ItemError::ToolTimeout { .. }
    ));
}

#[tokio::test]
async fn describe_converts_only_the_first_of_duplicate_identifiers() {
    let ws = Workspace::new();
    ws.touch("binders/Binder1/5_Alpha_Ann.docx", b"docx");
    ws.touch("binders/Binder2/5_Beta_Bob.docx", b"docx");
    let converter = FakeConverter {
        markdown: HashMap::from([
            ("5_Alpha_Ann.docx".to_string(), "Alpha.\n".to_string()),
            ("5_Beta_Bob.docx".to_string(), "Beta.\n".to_string()),
        ]),
        fail_names: vec![],
    };

    let report = describe::describe_all(&ws.config(), &converter).await.unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(
        fs::read_to_string(ws.path("images/5/description-5.md")).unwrap(),
        "Alpha.\n"
    );
}

// ── Assemble ─────────────────────────────────────────────────────────────────

#[test]
fn assemble_applies_override_precedence() {
    let ws = Workspace::new();
    ws.touch("overrides.tsv", OVERRIDES.as_bytes());
    ws.touch("binders/Binder9/Scans/123_Doe_Jane_Botany_Sketch.docx", b"docx");
    ws.touch(
        "images/123/description-123.md",
        b"A heron\nin the marsh.\n\nContents: one sheet.\n\n**Recto**: pencil **Verso**: ink\n",
    );

    let report = assemble::assemble_all(&ws.config()).unwrap();
    assert_eq!(report.produced.len(), 1);
    assert!(report.is_clean(), "{:?}", report.warnings);

    let record = MetadataRecord::read(&ws.path("images/123/metadata-123.json")).unwrap();
    assert_eq!(record.id, "scan-123");
    // "0123" in the table matches item "123".
    assert_eq!(record.creator, "Bartram, William");
    // Empty override subject falls back to the file name.
    assert_eq!(record.subject.as_deref(), Some("Botany"));
    assert_eq!(record.kind.as_deref(), Some("Sketch"));
    assert_eq!(record.location.as_deref(), Some("Linnean Society"));
    assert_eq!(record.within.as_deref(), Some("Binder 9"));
    assert_eq!(record.label, "A heron in the marsh.");
    assert_eq!(record.contents.as_deref(), Some("one sheet"));
    assert_eq!(record.recto.as_deref(), Some("pencil"));
    assert_eq!(record.verso.as_deref(), Some("ink"));
    assert_eq!(report.produced[0].record, record);
}

#[test]
fn assemble_without_override_or_description_keeps_keys_absent() {
    let ws = Workspace::new();
    ws.touch("overrides.tsv", OVERRIDES.as_bytes());
    ws.touch("binders/77_Roe_Richard.docx", b"docx");

    let report = assemble::assemble_all(&ws.config()).unwrap();
    assert_eq!(report.produced.len(), 1);
    // Missing description is a warning, not a failure.
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.exit_status(), ExitStatus::Partial);

    let raw = fs::read_to_string(ws.path("images/77/metadata-77.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["creator"], "Roe, Richard");
    assert!(json.get("location").is_none());
    assert!(json.get("subject").is_none());
    assert!(json.get("recto").is_none());
}

#[test]
fn assemble_override_subject_wins_over_file_name_subject() {
    let ws = Workspace::new();
    ws.touch(
        "overrides.tsv",
        b"Binder4\t31\t\tBotany\t\t\t\t\n",
    );
    ws.touch("binders/Binder4/31_Doe_Jane_Zoology_Sketch.docx", b"docx");
    ws.touch("binders/Binder4/32_Doe_Jane_Zoology_Sketch.docx", b"docx");
    ws.touch("images/31/description-31.md", b"Thirty-one.\n");
    ws.touch("images/32/description-32.md", b"Thirty-two.\n");

    let report = assemble::assemble_all(&ws.config()).unwrap();
    assert_eq!(report.produced.len(), 2);

    let overridden = MetadataRecord::read(&ws.path("images/31/metadata-31.json")).unwrap();
    assert_eq!(overridden.subject.as_deref(), Some("Botany"));
    // No override cell for creator, so the file name still supplies it.
    assert_eq!(overridden.creator, "Doe, Jane");

    let plain = MetadataRecord::read(&ws.path("images/32/metadata-32.json")).unwrap();
    assert_eq!(plain.subject.as_deref(), Some("Zoology"));
}

#[test]
fn assemble_keeps_first_of_duplicate_identifiers() {
    let ws = Workspace::new();
    ws.touch("overrides.tsv", OVERRIDES.as_bytes());
    ws.touch("binders/Binder1/5_Alpha_Ann_Birds_Sketch.docx", b"docx");
    ws.touch("binders/Binder2/5_Beta_Bob_Birds_Sketch.docx", b"docx");
    ws.touch("images/5/description-5.md", b"Five.\n");

    let report = assemble::assemble_all(&ws.config()).unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].item, "5_Beta_Bob_Birds_Sketch.docx");
    assert_eq!(report.produced[0].record.creator, "Alpha, Ann");
    assert_eq!(report.produced[0].record.within.as_deref(), Some("Binder 1"));

    let on_disk = MetadataRecord::read(&ws.path("images/5/metadata-5.json")).unwrap();
    assert_eq!(on_disk, report.produced[0].record);
}

#[test]
fn assemble_without_override_table_is_fatal() {
    let ws = Workspace::new();
    ws.touch("binders/1_Doe_Jane.docx", b"docx");
    let err = assemble::assemble_all(&ws.config()).unwrap_err();
    assert!(matches!(err, ArchiveError::OverrideTableMissing { .. }));
    assert!(!ws.path("images/1/metadata-1.json").exists());
}

#[test]
fn assemble_reports_malformed_override_rows() {
    let ws = Workspace::new();
    ws.touch("overrides.tsv", b"Binder1\t5\tonly three\n");
    ws.touch("binders/5_Doe_Jane.docx", b"docx");
    ws.touch("images/5/description-5.md", b"Five.\n");

    let report = assemble::assemble_all(&ws.config()).unwrap();
    assert_eq!(report.produced.len(), 1);
    assert!(report.warnings.iter().any(|w| w.contains("line 1")));
}

// ── Manifest ─────────────────────────────────────────────────────────────────

fn scan_42(ws: &Workspace) -> StoredRecord {
    let record = MetadataRecord {
        id: "scan-42".into(),
        creator: "Doe, Jane".into(),
        subject: Some("Birds".into()),
        label: "A heron".into(),
        description: "A heron".into(),
        ..Default::default()
    };
    ws.touch("images/42/image-42-01.jpg", b"jpeg");
    ws.touch("images/42/image-42-00.jpg", b"jpeg");
    stored(ws, record)
}

#[tokio::test]
async fn manifest_has_one_canvas_per_page_and_is_byte_stable() {
    let ws = Workspace::new();
    scan_42(&ws);
    ws.touch("images/42/cover.jpg", b"jpeg");
    let probe = FakeProbe::new(1275, 1650);
    let config = ws.config();

    let report = manifest::build_manifests(&config, None, &probe).await.unwrap();
    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.produced[0].canvases, 2);
    // cover.jpg has no page index.
    assert_eq!(report.warnings.len(), 1);

    let path = ws.path("manifests/scan-42.json");
    let first = fs::read(&path).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(json["@id"], "http://iiif.test:3000/manifest/scan-42");
    assert_eq!(
        json["sequences"][0]["@id"],
        "http://iiif.test:3000/sequence/scan-42"
    );
    let canvases = json["sequences"][0]["canvases"].as_array().unwrap();
    assert_eq!(canvases.len(), 2);
    assert_eq!(canvases[0]["label"], "image-42-00");
    assert_eq!(canvases[1]["label"], "image-42-01");
    assert_eq!(canvases[0]["width"], 1275);
    assert_eq!(canvases[0]["height"], 1650);
    assert_eq!(json["metadata"][1]["label"], "Subject");

    manifest::build_manifests(&config, None, &probe).await.unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[tokio::test]
async fn manifest_probe_failure_fails_only_that_item() {
    let ws = Workspace::new();
    let good = scan_42(&ws);
    let bad = stored(
        &ws,
        MetadataRecord {
            id: "scan-43".into(),
            label: "Broken".into(),
            description: "Broken".into(),
            ..Default::default()
        },
    );
    ws.touch("images/43/image-43-00.jpg", b"garbage");
    let probe = FakeProbe {
        fail_on: Some("image-43-00.jpg".into()),
        ..FakeProbe::new(10, 10)
    };

    let records = vec![good, bad];
    let report = manifest::build_manifests(&ws.config(), Some(&records), &probe)
        .await
        .unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(ws.path("manifests/scan-42.json").exists());
    assert!(!ws.path("manifests/scan-43.json").exists());
}

// ── Index ────────────────────────────────────────────────────────────────────

fn indexed_record(ws: &Workspace, id: &str) -> StoredRecord {
    stored(
        ws,
        MetadataRecord {
            id: id.into(),
            creator: "Doe, Jane".into(),
            label: "Quercus alba leaf".into(),
            description: "Quercus alba leaf".into(),
            recto: Some("front".into()),
            verso: Some("back".into()),
            location: Some("Linnean Society".into()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn index_builds_documents_and_commits_once() {
    let ws = Workspace::new();
    let records = vec![indexed_record(&ws, "scan-1"), indexed_record(&ws, "scan-2")];
    let search = RecordingSearch::default();
    let entities = FakeEntities {
        names: vec!["Quercus alba".into()],
        fail: false,
    };

    let report = index::index_records(&ws.config(), Some(&records), &search, &entities, now())
        .await
        .unwrap();

    assert_eq!(report.produced, vec!["scan-1", "scan-2"]);
    assert_eq!(search.commits(), 1);
    let docs = search.added();
    assert_eq!(docs[0].text, "Quercus alba leaf front back");
    assert_eq!(docs[0].gnrd_sm.as_deref(), Some(&["Quercus alba".to_string()][..]));
    assert_eq!(docs[0].author_display_facet.as_deref(), Some("Doe, Jane"));
    assert_eq!(docs[0].location_facet.as_deref(), Some("Linnean Society"));
    assert_eq!(
        docs[0].iiif_thumbnail_s.as_deref(),
        Some("http://iiif.test:3000/image-service/image-1-00/full/150,150/0/default.jpg")
    );
    assert_eq!(docs[0].object_type_s.as_deref(), Some("scan"));
    assert_eq!(docs[0].timestamp, "2024-05-01T12:00:00Z");
}

#[tokio::test]
async fn index_discovers_records_on_disk() {
    let ws = Workspace::new();
    indexed_record(&ws, "scan-9");
    let search = RecordingSearch::default();
    let entities = FakeEntities {
        names: vec![],
        fail: false,
    };

    let report = index::index_records(&ws.config(), None, &search, &entities, now())
        .await
        .unwrap();
    assert_eq!(report.produced, vec!["scan-9"]);
}

#[tokio::test]
async fn entity_failure_still_indexes_without_names() {
    let ws = Workspace::new();
    let records = vec![indexed_record(&ws, "scan-1")];
    let search = RecordingSearch::default();
    let entities = FakeEntities {
        names: vec![],
        fail: true,
    };

    let report = index::index_records(&ws.config(), Some(&records), &search, &entities, now())
        .await
        .unwrap();

    assert_eq!(report.produced.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    let docs = search.added();
    assert!(docs[0].gnrd_sm.is_none());
    let json = serde_json::to_value(&docs[0]).unwrap();
    assert!(json.get("gnrd_sm").is_none());
}

#[tokio::test]
async fn unreachable_search_engine_aborts_before_any_document() {
    let ws = Workspace::new();
    let records = vec![indexed_record(&ws, "scan-1")];
    let search = RecordingSearch {
        down: true,
        ..Default::default()
    };
    let entities = FakeEntities {
        names: vec![],
        fail: false,
    };

    let err = index::index_records(&ws.config(), Some(&records), &search, &entities, now())
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::SearchUnavailable { .. }));
    assert!(search.added().is_empty());
    assert_eq!(search.commits(), 0);
}

#[tokio::test]
async fn submit_failure_aborts_without_commit() {
    let ws = Workspace::new();
    let records = vec![indexed_record(&ws, "scan-1"), indexed_record(&ws, "scan-2")];
    let search = RecordingSearch {
        reject_id: Some("scan-2".into()),
        ..Default::default()
    };
    let entities = FakeEntities {
        names: vec![],
        fail: false,
    };

    let err = index::index_records(&ws.config(), Some(&records), &search, &entities, now())
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::SearchSubmitFailed { ref id, .. } if id == "scan-2"));
    assert_eq!(search.added().len(), 1);
    assert_eq!(search.commits(), 0);
}

// ── Notebooks ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn notebook_convert_names_markdown_after_the_document() {
    let ws = Workspace::new();
    ws.touch("notebooks/Book2/entry3_book2-Herons.docx", b"docx");
    let converter = FakeConverter::default();

    let report = notebook::convert_notebooks(&ws.config(), &converter)
        .await
        .unwrap();
    assert_eq!(report.produced.len(), 1);
    assert!(ws.path("notebook_markdown/entry3_book2-Herons.md").exists());
}

#[tokio::test]
async fn notebook_index_derives_identity_and_flags_long_transcripts() {
    let ws = Workspace::new();
    ws.touch("notebook_markdown/entry3_book2-Herons.md", b"   wrapped line\nnext\n");
    ws.touch("notebook_markdown/entry1_book1.md", "x".repeat(50).as_bytes());
    ws.touch("notebook_markdown/entryX_bookY.md", b"bad name");
    ws.touch("notebook_markdown/index.md", b"not a transcript");
    let config = ws.builder().notebook_length_warning(20).build().unwrap();
    let search = RecordingSearch::default();

    let report = notebook::index_notebooks(&config, &search, now()).await.unwrap();

    assert_eq!(report.produced, vec!["notebook-01-01", "notebook-02-03"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(search.commits(), 1);

    let docs = search.added();
    let herons = docs.iter().find(|d| d.id == "notebook-02-03").unwrap();
    assert_eq!(herons.title_display, "Notebook 2, Entry 3, Herons");
    assert_eq!(herons.part_of_s.as_deref(), Some("Notebook 2"));
    assert_eq!(herons.text, "  wrapped line\nnext\n");
    assert_eq!(herons.format, "text");
    let plain = docs.iter().find(|d| d.id == "notebook-01-01").unwrap();
    assert_eq!(plain.title_display, "Notebook 1, Entry 1");
    assert!(plain.subject_topic_facet.is_none());
}

// ── Export ───────────────────────────────────────────────────────────────────

#[test]
fn export_metadata_copies_only_new_records() {
    let ws = Workspace::new();
    ws.touch("images/779/metadata-779.json", b"{}");
    ws.touch("images/806/metadata-806.json", b"{}");
    let dest = ws.path("solrscans");

    let report = export::export_files(&ws.config(), ExportKind::Metadata, 779, &dest).unwrap();
    assert_eq!(report.produced, vec![dest.join("metadata-806.json")]);
    assert!(!dest.join("metadata-779.json").exists());
}

// ── Composed run ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct CountingCallback {
    stages: AtomicUsize,
    completed: AtomicUsize,
}

impl StageProgressCallback for CountingCallback {
    fn on_stage_start(&self, _stage: &str, _total_items: usize) {
        self.stages.fetch_add(1, Ordering::SeqCst);
    }

    fn on_item_complete(&self, _stage: &str, _item: &str) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn full_pipeline_hands_records_from_stage_to_stage() {
    let ws = Workspace::new();
    ws.touch("overrides.tsv", OVERRIDES.as_bytes());
    ws.touch("binders/Binder2/Scans/7_Doe_Jane_Birds_Sketch.pdf", b"%PDF");
    ws.touch("binders/Binder2/7_Doe_Jane_Birds_Sketch.docx", b"docx");

    let counter = Arc::new(CountingCallback::default());
    let config = ws
        .builder()
        .progress_callback(counter.clone() as Arc<dyn StageProgressCallback>)
        .build()
        .unwrap();

    let search = Arc::new(RecordingSearch::default());
    let tools = Collaborators {
        rasterizer: Arc::new(FakeRasterizer {
            pages: 2,
            ..Default::default()
        }),
        converter: Arc::new(FakeConverter {
            markdown: HashMap::from([(
                "7_Doe_Jane_Birds_Sketch.docx".to_string(),
                "Two herons.\n\n**Recto**: pencil\n".to_string(),
            )]),
            fail_names: vec![],
        }),
        probe: Arc::new(FakeProbe::new(800, 600)),
        search: search.clone(),
        entities: Arc::new(FakeEntities {
            names: vec!["Ardea herodias".into()],
            fail: false,
        }),
    };

    let report = run_pipeline(&config, &tools, PipelineSteps::default())
        .await
        .unwrap();

    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["rasterize", "describe", "assemble", "manifest", "index"]);
    assert_eq!(report.exit_status, ExitStatus::Success);
    assert_eq!(counter.stages.load(Ordering::SeqCst), 5);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 5);

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(ws.path("manifests/scan-7.json")).unwrap()).unwrap();
    assert_eq!(manifest["label"], "Two herons.");
    assert_eq!(
        manifest["sequences"][0]["canvases"].as_array().unwrap().len(),
        2
    );

    let docs = search.added();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id, "scan-7");
    assert_eq!(docs[0].part_of_facet.as_deref(), Some("Binder 2"));
    assert_eq!(docs[0].recto_s.as_deref(), Some("pencil"));
    assert_eq!(search.commits(), 1);
}
