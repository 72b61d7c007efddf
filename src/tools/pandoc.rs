//! Document conversion through pandoc.

use super::process::run_tool;
use super::DocumentConverter;
use crate::config::PipelineConfig;
use crate::error::ItemError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

/// Runs `pandoc -t markdown -o <output> <input>`.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    pub program: String,
    pub timeout_secs: u64,
}

impl PandocConverter {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: "pandoc".to_string(),
            timeout_secs: config.tool_timeout_secs,
        }
    }

    fn args(input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-t".into(),
            "markdown".into(),
            "-o".into(),
            output.as_os_str().to_owned(),
            input.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl DocumentConverter for PandocConverter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<(), ItemError> {
        run_tool(
            &self.program,
            Self::args(input, output),
            input,
            self.timeout_secs,
        )
        .await?;
        if !output.is_file() {
            return Err(ItemError::MissingExpectedFile {
                path: output.to_path_buf(),
            });
        }
        Ok(())
    }
}
