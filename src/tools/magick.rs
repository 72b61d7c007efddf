//! ImageMagick rasteriser.

use super::process::run_tool;
use super::{existing_page_images, RasterizeTool};
use crate::config::PipelineConfig;
use crate::error::ItemError;
use crate::naming::ItemId;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runs `convert -density <dpi> <pdf> -quality <q> <out_dir>/image-<id>-%02d.jpg`.
#[derive(Debug, Clone)]
pub struct MagickRasterizer {
    pub program: String,
    pub density: u32,
    pub quality: u8,
    pub timeout_secs: u64,
}

impl MagickRasterizer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: "convert".to_string(),
            density: config.density,
            quality: config.jpeg_quality,
            timeout_secs: config.tool_timeout_secs,
        }
    }

    fn args(&self, pdf: &Path, out_dir: &Path, id: &ItemId) -> Vec<OsString> {
        vec![
            "-density".into(),
            self.density.to_string().into(),
            pdf.as_os_str().to_owned(),
            "-quality".into(),
            self.quality.to_string().into(),
            out_dir.join(id.image_pattern()).into_os_string(),
        ]
    }
}

#[async_trait]
impl RasterizeTool for MagickRasterizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn rasterize(
        &self,
        pdf: &Path,
        out_dir: &Path,
        id: &ItemId,
    ) -> Result<Vec<PathBuf>, ItemError> {
        run_tool(&self.program, self.args(pdf, out_dir, id), pdf, self.timeout_secs).await?;

        let images = existing_page_images(out_dir, id);
        if images.is_empty() {
            return Err(ItemError::ToolFailed {
                tool: self.program.clone(),
                path: pdf.to_path_buf(),
                detail: "no page images were produced".into(),
            });
        }
        debug!(id = %id, pages = images.len(), "rasterised");
        Ok(images)
    }
}
