//! Image dimension probes.

use super::process::run_tool;
use super::ImageProbe;
use crate::config::PipelineConfig;
use crate::error::ItemError;
use async_trait::async_trait;
use std::path::Path;

/// Reads width and height from the image header without decoding pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProbe;

#[async_trait]
impl ImageProbe for NativeProbe {
    async fn dimensions(&self, image: &Path) -> Result<(u32, u32), ItemError> {
        let path = image.to_path_buf();
        tokio::task::spawn_blocking(move || image::image_dimensions(&path))
            .await
            .map_err(|e| ItemError::ToolFailed {
                tool: "image".into(),
                path: image.to_path_buf(),
                detail: format!("probe task panicked: {e}"),
            })?
            .map_err(|e| ItemError::ToolFailed {
                tool: "image".into(),
                path: image.to_path_buf(),
                detail: e.to_string(),
            })
    }
}

/// Asks ImageMagick: `identify -format "%w %h" <image>`.
#[derive(Debug, Clone)]
pub struct IdentifyProbe {
    pub program: String,
    pub timeout_secs: u64,
}

impl IdentifyProbe {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: "identify".to_string(),
            timeout_secs: config.tool_timeout_secs,
        }
    }
}

#[async_trait]
impl ImageProbe for IdentifyProbe {
    async fn dimensions(&self, image: &Path) -> Result<(u32, u32), ItemError> {
        let args = [
            std::ffi::OsStr::new("-format"),
            std::ffi::OsStr::new("%w %h"),
            image.as_os_str(),
        ];
        let output = run_tool(&self.program, args, image, self.timeout_secs).await?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_width_height(&text).ok_or_else(|| ItemError::ToolFailed {
            tool: self.program.clone(),
            path: image.to_path_buf(),
            detail: format!("unexpected output {:?}", text.trim()),
        })
    }
}

/// Parse `"<w> <h>"`, tolerating surrounding whitespace.
fn parse_width_height(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some((width, height))
}
