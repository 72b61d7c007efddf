//! Configuration types for the archive pipeline.
//!
//! Every path, endpoint and URL prefix the operator used to edit between runs
//! lives in one [`PipelineConfig`], built once per invocation via its
//! [`PipelineConfigBuilder`] and threaded explicitly into each stage. Stages
//! never mutate it.

use crate::error::ArchiveError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default public URL prefix used to build every IIIF identifier.
pub const DEFAULT_URL_PREFIX: &str = "http://localhost:3000";

/// Default Solr core.
pub const DEFAULT_SEARCH_URL: &str = "http://127.0.0.1:8983/solr/bertram2";

/// Global Names name-finder endpoint used for scientific-name detection.
pub const DEFAULT_ENTITY_FINDER_URL: &str = "http://gnrd.globalnames.org/name_finder.json";

/// Upper bound for [`PipelineConfigBuilder::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration for one pipeline invocation.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2iiif::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .source_root("binders")
///     .output_root("images")
///     .url_prefix("http://10.5.96.214:3000/")
///     .build()
///     .unwrap();
/// assert_eq!(config.url_prefix, "http://10.5.96.214:3000");
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory holding the scan PDFs and description `.docx` files.
    pub source_root: PathBuf,

    /// Per-item output tree: `<output_root>/<id>/{image-*,description-*,metadata-*}`.
    pub output_root: PathBuf,

    /// Flat directory receiving `scan-<id>.json` manifests.
    pub manifest_root: PathBuf,

    /// Tab-separated override table with manually corrected metadata.
    pub override_table_path: PathBuf,

    /// Solr core base URL, e.g. `http://127.0.0.1:8983/solr/core`.
    pub search_url: String,

    /// Public prefix for manifest, sequence, canvas and image-service ids.
    pub url_prefix: String,

    /// Where published manifests are served from; search documents link to
    /// `<manifest_base_url>/<id>.json`. Defaults to `<url_prefix>/manifests`.
    pub manifest_base_url: Option<String>,

    /// Directory holding notebook transcript `.docx` files.
    pub notebook_source_root: PathBuf,

    /// Directory receiving converted notebook markdown.
    pub notebook_markdown_root: PathBuf,

    /// Name-finder service queried for scientific names in labels.
    pub entity_finder_url: String,

    /// Rasterisation density in DPI. Range: 72–600. Default: 150.
    pub density: u32,

    /// JPEG quality of rasterised pages. Range: 1–100. Default: 100.
    pub jpeg_quality: u8,

    /// Which rasteriser produces the page images. Default: ImageMagick.
    pub raster_backend: RasterBackend,

    /// How page dimensions are measured. Default: in-process header read.
    pub probe_backend: ProbeBackend,

    /// Upper bound for any single external process call. Default: 300.
    pub tool_timeout_secs: u64,

    /// Per-request HTTP timeout for search and name-finder calls. Default: 60.
    pub http_timeout_secs: u64,

    /// Retries for name-finder calls. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Skip items whose stage output already exists. Default: false.
    pub skip_existing: bool,

    /// Author stamped on every notebook search document.
    pub notebook_author: String,

    /// Holding institution stamped on every notebook search document.
    pub notebook_location: String,

    /// Transcripts longer than this many characters are flagged. Default: 32 000.
    pub notebook_length_warning: usize,

    /// Optional stage/item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("binders"),
            output_root: PathBuf::from("images"),
            manifest_root: PathBuf::from("manifests"),
            override_table_path: PathBuf::from("images/scans_metadata_edited.tsv"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            manifest_base_url: None,
            notebook_source_root: PathBuf::from("notebooks"),
            notebook_markdown_root: PathBuf::from("notebook_markdown"),
            entity_finder_url: DEFAULT_ENTITY_FINDER_URL.to_string(),
            density: 150,
            jpeg_quality: 100,
            raster_backend: RasterBackend::default(),
            probe_backend: ProbeBackend::default(),
            tool_timeout_secs: 300,
            http_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
            skip_existing: false,
            notebook_author: "Meyers, Amy".to_string(),
            notebook_location: "Yale Center for British Art".to_string(),
            notebook_length_warning: 32_000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("source_root", &self.source_root)
            .field("output_root", &self.output_root)
            .field("manifest_root", &self.manifest_root)
            .field("override_table_path", &self.override_table_path)
            .field("search_url", &self.search_url)
            .field("url_prefix", &self.url_prefix)
            .field("manifest_base_url", &self.manifest_base_url)
            .field("density", &self.density)
            .field("raster_backend", &self.raster_backend)
            .field("probe_backend", &self.probe_backend)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("skip_existing", &self.skip_existing)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn StageProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Base URL that search documents use to link manifests.
    pub fn manifest_base_url(&self) -> String {
        self.manifest_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/manifests", self.url_prefix))
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_root = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn manifest_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_root = path.into();
        self
    }

    pub fn override_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.override_table_path = path.into();
        self
    }

    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.config.search_url = url.into();
        self
    }

    pub fn url_prefix(mut self, url: impl Into<String>) -> Self {
        self.config.url_prefix = url.into();
        self
    }

    pub fn manifest_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.manifest_base_url = Some(url.into());
        self
    }

    pub fn notebook_source_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notebook_source_root = path.into();
        self
    }

    pub fn notebook_markdown_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notebook_markdown_root = path.into();
        self
    }

    pub fn entity_finder_url(mut self, url: impl Into<String>) -> Self {
        self.config.entity_finder_url = url.into();
        self
    }

    pub fn density(mut self, dpi: u32) -> Self {
        self.config.density = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn raster_backend(mut self, backend: RasterBackend) -> Self {
        self.config.raster_backend = backend;
        self
    }

    pub fn probe_backend(mut self, backend: ProbeBackend) -> Self {
        self.config.probe_backend = backend;
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs;
        self
    }

    /// Clamped to `0..=10`.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    pub fn notebook_author(mut self, author: impl Into<String>) -> Self {
        self.config.notebook_author = author.into();
        self
    }

    pub fn notebook_location(mut self, location: impl Into<String>) -> Self {
        self.config.notebook_location = location.into();
        self
    }

    pub fn notebook_length_warning(mut self, chars: usize) -> Self {
        self.config.notebook_length_warning = chars;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// URL prefixes lose any trailing `/` so identifiers never contain `//`.
    pub fn build(mut self) -> Result<PipelineConfig, ArchiveError> {
        let c = &mut self.config;

        c.url_prefix = normalise_url("url_prefix", &c.url_prefix)?;
        c.search_url = normalise_url("search_url", &c.search_url)?;
        c.entity_finder_url = normalise_url("entity_finder_url", &c.entity_finder_url)?;
        if let Some(base) = c.manifest_base_url.take() {
            c.manifest_base_url = Some(normalise_url("manifest_base_url", &base)?);
        }

        if c.tool_timeout_secs == 0 {
            return Err(ArchiveError::InvalidConfig(
                "tool_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.http_timeout_secs == 0 {
            return Err(ArchiveError::InvalidConfig(
                "http_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.output_root.as_os_str().is_empty() {
            return Err(ArchiveError::InvalidConfig(
                "output_root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

fn normalise_url(field: &str, raw: &str) -> Result<String, ArchiveError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| {
        ArchiveError::InvalidConfig(format!("{field} '{raw}' is not a valid URL: {e}"))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ArchiveError::InvalidConfig(format!(
            "{field} must be http or https, got '{}'",
            parsed.scheme()
        )));
    }
    Ok(trimmed.to_string())
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Page rasteriser implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterBackend {
    /// ImageMagick `convert -density N in.pdf -quality Q image-<id>-%02d.jpg`. (default)
    #[default]
    Magick,
    /// In-process pdfium rendering; needs a system libpdfium.
    Pdfium,
}

/// Image-dimension probe implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeBackend {
    /// Read the JPEG header in-process. (default)
    #[default]
    Native,
    /// ImageMagick `identify -format '%w %h'`.
    Identify,
}
