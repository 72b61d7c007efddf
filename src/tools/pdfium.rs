//! In-process rasterisation via pdfium.
//!
//! pdfium keeps thread-local state and is CPU-bound, so the whole document is
//! rendered inside `tokio::task::spawn_blocking`. Pages are scaled by
//! `density / 72` (PDF user space is 72 units per inch) and written as
//! baseline JPEGs at the configured quality, using the same file names the
//! ImageMagick backend produces.

use super::RasterizeTool;
use crate::config::PipelineConfig;
use crate::error::ItemError;
use crate::naming::ItemId;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TOOL: &str = "pdfium";

#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    /// Directory containing the pdfium shared library. Falls back to the
    /// system library search path when unset or unloadable.
    pub library_dir: Option<PathBuf>,
    pub density: u32,
    pub quality: u8,
}

impl PdfiumRasterizer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            library_dir: std::env::var_os("PDFIUM_LIB_DIR").map(PathBuf::from),
            density: config.density,
            quality: config.jpeg_quality,
        }
    }
}

#[async_trait]
impl RasterizeTool for PdfiumRasterizer {
    fn name(&self) -> &str {
        TOOL
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
        id: &ItemId,
    ) -> Result<Vec<PathBuf>, ItemError> {
        let this = self.clone();
        let pdf_path = pdf.to_path_buf();
        let out = out_dir.to_path_buf();
        let id = id.clone();

        tokio::task::spawn_blocking(move || this.render_blocking(&pdf_path, &out, &id))
            .await
            .map_err(|e| ItemError::ToolFailed {
                tool: TOOL.into(),
                path: pdf.to_path_buf(),
                detail: format!("render task panicked: {e}"),
            })?
    }
}

impl PdfiumRasterizer {
    fn bind(&self) -> Result<Pdfium, String> {
        let local = self.library_dir.as_ref().map(|dir| {
            Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(dir))
        });
        let bindings = match local {
            Some(Ok(bindings)) => bindings,
            _ => Pdfium::bind_to_system_library().map_err(|e| format!("{e:?}"))?,
        };
        Ok(Pdfium::new(bindings))
    }

    fn render_blocking(
        &self,
        pdf_path: &Path,
        out_dir: &Path,
        id: &ItemId,
    ) -> Result<Vec<PathBuf>, ItemError> {
        let failed = |detail: String| ItemError::ToolFailed {
            tool: TOOL.into(),
            path: pdf_path.to_path_buf(),
            detail,
        };

        let pdfium = self
            .bind()
            .map_err(|e| failed(format!("pdfium library unavailable: {e}")))?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| failed(format!("cannot open PDF: {e:?}")))?;

        let render_config =
            PdfRenderConfig::new().scale_page_by_factor(self.density as f32 / 72.0);

        let pages = document.pages();
        info!(id = %id, pages = pages.len(), "PDF loaded");

        let mut written = Vec::with_capacity(pages.len() as usize);
        for (index, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| failed(format!("page {}: {e:?}", index + 1)))?;
            let rgb = bitmap.as_image().to_rgb8();

            let target = out_dir.join(id.image_file_name(index));
            let file = File::create(&target).map_err(|e| ItemError::io(&target, &e))?;
            let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), self.quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| failed(format!("page {}: JPEG encoding failed: {e}", index + 1)))?;

            debug!(
                id = %id,
                page = index,
                width = rgb.width(),
                height = rgb.height(),
                "page rendered"
            );
            written.push(target);
        }

        if written.is_empty() {
            return Err(failed("document has no pages".into()));
        }
        Ok(written)
    }
}
