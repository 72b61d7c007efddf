//! External collaborators behind narrow, mockable interfaces.
//!
//! Each stage only sees these traits, so tests drive the whole pipeline with
//! in-memory fakes while production wires in the real tools:
//!
//! | Trait | Production implementation(s) |
//! |-------|------------------------------|
//! | [`RasterizeTool`] | [`MagickRasterizer`] (`convert`), [`PdfiumRasterizer`] (pdfium-render) |
//! | [`DocumentConverter`] | [`PandocConverter`] (`pandoc -t markdown`) |
//! | [`ImageProbe`] | [`NativeProbe`] (JPEG header), [`IdentifyProbe`] (`identify`) |
//!
//! Every external process goes through [`process::run_tool`], which enforces
//! the configured timeout and kills the child when it expires.

pub mod magick;
pub mod pandoc;
pub mod pdfium;
pub mod probe;
pub mod process;

pub use magick::MagickRasterizer;
pub use pandoc::PandocConverter;
pub use pdfium::PdfiumRasterizer;
pub use probe::{IdentifyProbe, NativeProbe};

use crate::config::{PipelineConfig, ProbeBackend, RasterBackend};
use crate::error::ItemError;
use crate::naming::ItemId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Turns a scan PDF into numbered page images.
#[async_trait]
pub trait RasterizeTool: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Rasterise `pdf` into `out_dir`, naming pages `image-<id>-NN.jpg`.
    ///
    /// Returns the produced images sorted by name.
    async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
        id: &ItemId,
    ) -> Result<Vec<PathBuf>, ItemError>;
}

/// Turns a word-processor document into markdown text.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    fn name(&self) -> &str;

    /// Convert `input` and write UTF-8 markdown to `output`.
    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ItemError>;
}

/// Measures image pixel dimensions.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// `(width, height)` in pixels.
    async fn dimensions(&self, image: &Path) -> Result<(u32, u32), ItemError>;
}

/// The rasteriser selected by `config.raster_backend`.
pub fn rasterizer_for(config: &PipelineConfig) -> Arc<dyn RasterizeTool> {
    match config.raster_backend {
        RasterBackend::Magick => Arc::new(MagickRasterizer::from_config(config)),
        RasterBackend::Pdfium => Arc::new(PdfiumRasterizer::from_config(config)),
    }
}

/// The dimension probe selected by `config.probe_backend`.
pub fn probe_for(config: &PipelineConfig) -> Arc<dyn ImageProbe> {
    match config.probe_backend {
        ProbeBackend::Native => Arc::new(NativeProbe),
        ProbeBackend::Identify => Arc::new(IdentifyProbe::from_config(config)),
    }
}

/// Page images already present in `dir` for `id`, sorted by name.
pub fn existing_page_images(dir: &Path, id: &ItemId) -> Vec<PathBuf> {
    let prefix = id.image_prefix();
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && crate::fsutil::has_extension(path, "jpg")
                && crate::fsutil::file_name(path).starts_with(&prefix)
        })
        .collect();
    images.sort();
    images
}
