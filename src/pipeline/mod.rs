//! Pipeline stages for turning the archive into a searchable IIIF collection.
//!
//! Each submodule implements exactly one stage. Stages share nothing but the
//! [`crate::PipelineConfig`] and the on-disk naming convention, so each can
//! be re-run on its own; [`crate::run::run_pipeline`] composes them
//! in-process by handing each stage's [`crate::StageReport`] to the next.
//!
//! ## Data Flow
//!
//! ```text
//! *.pdf  ──▶ rasterize ──▶ image-<id>-NN.jpg ──────────────┐
//! *.docx ──▶ describe  ──▶ description-<id>.md            ▼
//!                 └──────▶ assemble ──▶ metadata-<id>.json ──▶ manifest ──▶ scan-<id>.json
//!               overrides ──┘                     │
//!                                                 └──────▶ index ──▶ search engine
//! notebooks/*.docx ──▶ notebook::convert ──▶ entry*.md ──▶ notebook::index
//! ```
//!
//! 1. [`rasterize`] - scan PDFs to page JPEGs through a [`crate::tools::RasterizeTool`]
//! 2. [`describe`]  - description documents to markdown through a
//!    [`crate::tools::DocumentConverter`]
//! 3. [`assemble`]  - merge file-name tokens, override table and
//!    [`segment`]ed description text into a record
//! 4. [`manifest`]  - record and probed page images to a IIIF manifest
//! 5. [`index`]     - record to a search document, with entity extraction
//! 6. [`notebook`]  - notebook transcripts to full-text search documents
//! 7. [`export`]    - copy newly added items to a flat staging directory

pub mod assemble;
pub mod describe;
pub mod export;
pub mod index;
pub mod manifest;
pub mod notebook;
pub mod rasterize;
pub mod segment;
