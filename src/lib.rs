//! # scan2iiif
//!
//! Turn a digitised archive (scanned binder PDFs, description documents and
//! notebook transcripts) into a searchable IIIF collection.
//!
//! ## Why this crate?
//!
//! The archive's knowledge lives in loosely formatted description documents
//! and a hand-corrected spreadsheet. This crate extracts a normalised record
//! per item, reconciles it with the corrections, and derives every
//! cross-reference (page image ↔ record ↔ manifest ↔ search document) from
//! the item identifier alone, so independently re-run stages always agree.
//!
//! ## Pipeline Overview
//!
//! ```text
//! binders/
//!  │
//!  ├─ 1. Rasterize  scan PDFs → image-<id>-NN.jpg     (convert / pdfium)
//!  ├─ 2. Describe   *.docx → description-<id>.md      (pandoc)
//!  ├─ 3. Assemble   names + overrides + text → metadata-<id>.json
//!  ├─ 4. Manifest   record + page sizes → scan-<id>.json (IIIF 2)
//!  ├─ 5. Index      record → search document          (Solr, GNRD)
//!  └─ 6. Notebooks  transcripts → full-text documents
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2iiif::{run_pipeline, Collaborators, PipelineConfig, PipelineSteps};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .source_root("Meyers Natural History_Binders")
//!         .output_root("images")
//!         .manifest_root("manifests")
//!         .url_prefix("http://10.5.96.214:3000")
//!         .build()?;
//!     let tools = Collaborators::from_config(&config)?;
//!     let report = run_pipeline(&config, &tools, PipelineSteps::default()).await?;
//!     for stage in &report.stages {
//!         eprintln!("{}: {} ok, {} failed", stage.stage, stage.produced, stage.failed);
//!     }
//!     std::process::exit(report.exit_status.code().into());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2iiif` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2iiif = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub(crate) mod fsutil;
pub mod iiif;
pub mod naming;
pub mod output;
pub mod overrides;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod run;
pub mod search;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, ProbeBackend, RasterBackend};
pub use error::{ArchiveError, ItemError};
pub use iiif::Manifest;
pub use naming::{DescriptionName, ItemId, NotebookName};
pub use output::{ExitStatus, StageReport, StageSummary};
pub use overrides::{OverrideRecord, OverrideTable};
pub use pipeline::export::ExportKind;
pub use progress::{NoopProgressCallback, ProgressCallback, StageProgressCallback};
pub use record::{MetadataRecord, StoredRecord};
pub use run::{run_pipeline, Collaborators, PipelineReport, PipelineSteps};
pub use search::{EntityExtractor, SearchClient, SearchDocument};
pub use tools::{DocumentConverter, ImageProbe, RasterizeTool};
