//! CLI binary for scan2iiif.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs one stage (or the composed pipeline) and prints
//! the stage reports. Exit status: 0 all items processed, 1 some items
//! skipped or failed, 2 fatal error.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scan2iiif::pipeline::{assemble, describe, export, index, manifest, notebook, rasterize};
use scan2iiif::{
    run_pipeline, Collaborators, ExitStatus, ExportKind, PipelineConfig, PipelineSteps,
    ProbeBackend, ProgressCallback, RasterBackend, StageProgressCallback, StageReport,
};
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One progress bar per stage, replaced when the next stage starts.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }
}

impl StageProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: &str, total_items: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} items  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total_items as u64);
        bar.set_style(style);
        bar.set_prefix(stage.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn on_item_start(&self, _stage: &str, item: &str) {
        self.with_bar(|bar| bar.set_message(item.to_string()));
    }

    fn on_item_complete(&self, _stage: &str, _item: &str) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn on_item_skipped(&self, _stage: &str, item: &str, reason: &str) {
        self.with_bar(|bar| {
            bar.println(format!("  {} {item}  {}", yellow("↷"), dim(reason)));
            bar.inc(1);
        });
    }

    fn on_item_error(&self, _stage: &str, item: &str, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.with_bar(|bar| {
            bar.println(format!("  {} {item}  {}", red("✗"), red(&msg)));
            bar.inc(1);
        });
    }

    fn on_stage_complete(&self, _stage: &str, _succeeded: usize, _total_items: usize) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise every scan PDF under the binder tree
  scan2iiif --source-root "Meyers Natural History_Binders" --output-root images rasterize

  # Convert descriptions and assemble metadata records
  scan2iiif describe && scan2iiif assemble --override-table images/scans_metadata_edited.tsv

  # Build manifests for the image server at 10.5.96.214
  scan2iiif --url-prefix http://10.5.96.214:3000 --manifest-root instance_manifests manifests

  # Index scans into Solr
  scan2iiif --search-url http://127.0.0.1:8983/solr/bertram2 index

  # Notebook transcripts
  scan2iiif notebooks convert && scan2iiif notebooks index

  # Stage items above 779 for the image server
  scan2iiif export images --start 779 --dest iiif-images

  # Everything except indexing
  scan2iiif run --no-index

EXIT STATUS:
  0  every item processed
  1  some items skipped, failed or produced warnings
  2  fatal error (bad configuration, missing override table, search engine down)

ENVIRONMENT VARIABLES:
  Every option can be set through SCAN2IIIF_<OPTION>, e.g. SCAN2IIIF_URL_PREFIX.
  RUST_LOG        Override the log filter (e.g. scan2iiif=debug)
  PDFIUM_LIB_DIR  Directory holding libpdfium for --raster-backend pdfium
"#;

/// Convert a digitised archive into IIIF manifests and search documents.
#[derive(Parser, Debug)]
#[command(
    name = "scan2iiif",
    version,
    about = "Convert a digitised archive into IIIF manifests and search documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Directory holding scan PDFs and description documents.
    #[arg(long, global = true, env = "SCAN2IIIF_SOURCE_ROOT", default_value = "binders")]
    source_root: PathBuf,

    /// Per-item output tree.
    #[arg(long, global = true, env = "SCAN2IIIF_OUTPUT_ROOT", default_value = "images")]
    output_root: PathBuf,

    /// Directory receiving scan-<id>.json manifests.
    #[arg(long, global = true, env = "SCAN2IIIF_MANIFEST_ROOT", default_value = "manifests")]
    manifest_root: PathBuf,

    /// Tab-separated metadata override table. Default: <output-root>/scans_metadata_edited.tsv.
    #[arg(long, global = true, env = "SCAN2IIIF_OVERRIDE_TABLE")]
    override_table: Option<PathBuf>,

    /// Solr core URL.
    #[arg(long, global = true, env = "SCAN2IIIF_SEARCH_URL",
          default_value = scan2iiif::config::DEFAULT_SEARCH_URL)]
    search_url: String,

    /// Public prefix for every IIIF identifier.
    #[arg(long, global = true, env = "SCAN2IIIF_URL_PREFIX",
          default_value = scan2iiif::config::DEFAULT_URL_PREFIX)]
    url_prefix: String,

    /// Where published manifests are served. Default: <url-prefix>/manifests.
    #[arg(long, global = true, env = "SCAN2IIIF_MANIFEST_BASE_URL")]
    manifest_base_url: Option<String>,

    /// Directory holding notebook transcript documents.
    #[arg(long, global = true, env = "SCAN2IIIF_NOTEBOOK_SOURCE_ROOT", default_value = "notebooks")]
    notebook_source_root: PathBuf,

    /// Directory receiving converted notebook markdown.
    #[arg(long, global = true, env = "SCAN2IIIF_NOTEBOOK_MARKDOWN_ROOT",
          default_value = "notebook_markdown")]
    notebook_markdown_root: PathBuf,

    /// Scientific-name finder endpoint.
    #[arg(long, global = true, env = "SCAN2IIIF_ENTITY_FINDER_URL",
          default_value = scan2iiif::config::DEFAULT_ENTITY_FINDER_URL)]
    entity_finder_url: String,

    /// Rasterisation density in DPI (72–600).
    #[arg(long, global = true, env = "SCAN2IIIF_DENSITY", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    density: u32,

    /// JPEG quality of page images (1–100).
    #[arg(long, global = true, env = "SCAN2IIIF_JPEG_QUALITY", default_value_t = 100,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Page rasteriser.
    #[arg(long, global = true, env = "SCAN2IIIF_RASTER_BACKEND", value_enum, default_value = "magick")]
    raster_backend: RasterArg,

    /// Page dimension probe.
    #[arg(long, global = true, env = "SCAN2IIIF_PROBE_BACKEND", value_enum, default_value = "native")]
    probe_backend: ProbeArg,

    /// Timeout for each external tool call, in seconds.
    #[arg(long, global = true, env = "SCAN2IIIF_TOOL_TIMEOUT", default_value_t = 300)]
    tool_timeout: u64,

    /// Timeout for each HTTP request, in seconds.
    #[arg(long, global = true, env = "SCAN2IIIF_HTTP_TIMEOUT", default_value_t = 60)]
    http_timeout: u64,

    /// Retries for name-finder requests (at most 10).
    #[arg(long, global = true, env = "SCAN2IIIF_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Skip items whose stage output already exists.
    #[arg(long, global = true, env = "SCAN2IIIF_SKIP_EXISTING")]
    skip_existing: bool,

    /// Print stage reports as JSON on stdout.
    #[arg(long, global = true, env = "SCAN2IIIF_JSON")]
    json: bool,

    /// Disable progress bars.
    #[arg(long, global = true, env = "SCAN2IIIF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "SCAN2IIIF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "SCAN2IIIF_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan PDFs → image-<id>-NN.jpg.
    Rasterize,
    /// Description documents → description-<id>.md.
    Describe,
    /// File names + override table + descriptions → metadata-<id>.json.
    Assemble,
    /// Metadata records + page images → scan-<id>.json IIIF manifests.
    Manifests,
    /// Metadata records → search index.
    Index,
    /// Notebook transcripts.
    Notebooks {
        #[command(subcommand)]
        action: NotebookAction,
    },
    /// Copy newly added items into a flat directory.
    Export {
        #[arg(value_enum)]
        kind: ExportArg,
        /// Only items whose number is greater than this.
        #[arg(long)]
        start: u64,
        /// Destination directory.
        #[arg(long)]
        dest: PathBuf,
    },
    /// rasterize → describe → assemble → manifests → index.
    Run {
        #[arg(long)]
        no_rasterize: bool,
        #[arg(long)]
        no_describe: bool,
        #[arg(long)]
        no_manifests: bool,
        #[arg(long)]
        no_index: bool,
    },
}

#[derive(Subcommand, Debug)]
enum NotebookAction {
    /// Transcript documents → <basename>.md.
    Convert,
    /// entry*.md → full-text search documents.
    Index,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RasterArg {
    Magick,
    Pdfium,
}

impl From<RasterArg> for RasterBackend {
    fn from(v: RasterArg) -> Self {
        match v {
            RasterArg::Magick => RasterBackend::Magick,
            RasterArg::Pdfium => RasterBackend::Pdfium,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ProbeArg {
    Native,
    Identify,
}

impl From<ProbeArg> for ProbeBackend {
    fn from(v: ProbeArg) -> Self {
        match v {
            ProbeArg::Native => ProbeBackend::Native,
            ProbeArg::Identify => ProbeBackend::Identify,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ExportArg {
    Images,
    Metadata,
}

impl From<ExportArg> for ExportKind {
    fn from(v: ExportArg) -> Self {
        match v {
            ExportArg::Images => ExportKind::Images,
            ExportArg::Metadata => ExportKind::Metadata,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO lines would fight with the progress bar; warnings still
    // come through so skipped items are never silent.
    let show_progress = !cli.opts.quiet && !cli.opts.no_progress && !cli.opts.json;
    let filter = if cli.opts.verbose {
        "debug"
    } else if cli.opts.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli, show_progress).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            ExitCode::from(ExitStatus::Fatal.code())
        }
    }
}

async fn run(cli: Cli, show_progress: bool) -> Result<ExitStatus> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn StageProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli.opts, progress)?;
    let out = Reporter {
        json: cli.opts.json,
        quiet: cli.opts.quiet,
    };

    let status = match cli.command {
        Command::Rasterize => {
            let tool = scan2iiif::tools::rasterizer_for(&config);
            let report = rasterize::rasterize_all(&config, tool.as_ref())
                .await
                .context("Rasterisation failed")?;
            out.stage(&report)?
        }
        Command::Describe => {
            let tools = Collaborators::from_config(&config)?;
            let report = describe::describe_all(&config, tools.converter.as_ref())
                .await
                .context("Description conversion failed")?;
            out.stage(&report)?
        }
        Command::Assemble => {
            let report = assemble::assemble_all(&config).context("Metadata assembly failed")?;
            out.stage(&report)?
        }
        Command::Manifests => {
            let probe = scan2iiif::tools::probe_for(&config);
            let report = manifest::build_manifests(&config, None, probe.as_ref())
                .await
                .context("Manifest generation failed")?;
            out.stage(&report)?
        }
        Command::Index => {
            let tools = Collaborators::from_config(&config)?;
            let report = index::index_records(
                &config,
                None,
                tools.search.as_ref(),
                tools.entities.as_ref(),
                chrono::Utc::now(),
            )
            .await
            .context("Indexing failed")?;
            out.stage(&report)?
        }
        Command::Notebooks { action } => {
            let tools = Collaborators::from_config(&config)?;
            match action {
                NotebookAction::Convert => {
                    let report = notebook::convert_notebooks(&config, tools.converter.as_ref())
                        .await
                        .context("Notebook conversion failed")?;
                    out.stage(&report)?
                }
                NotebookAction::Index => {
                    let report =
                        notebook::index_notebooks(&config, tools.search.as_ref(), chrono::Utc::now())
                            .await
                            .context("Notebook indexing failed")?;
                    out.stage(&report)?
                }
            }
        }
        Command::Export { kind, start, dest } => {
            let report = export::export_files(&config, kind.into(), start, &dest)
                .with_context(|| format!("Export to {} failed", dest.display()))?;
            out.stage(&report)?
        }
        Command::Run {
            no_rasterize,
            no_describe,
            no_manifests,
            no_index,
        } => {
            let tools = Collaborators::from_config(&config)?;
            let steps = PipelineSteps {
                rasterize: !no_rasterize,
                describe: !no_describe,
                manifest: !no_manifests,
                index: !no_index,
            };
            let report = run_pipeline(&config, &tools, steps)
                .await
                .context("Pipeline failed")?;
            if out.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else if !out.quiet {
                for stage in &report.stages {
                    out.summary_line(
                        &stage.stage,
                        stage.produced,
                        stage.skipped,
                        stage.failed,
                        stage.warnings,
                        stage.duration_ms,
                    );
                }
            }
            report.exit_status
        }
    };
    Ok(status)
}

struct Reporter {
    json: bool,
    quiet: bool,
}

#[derive(Serialize)]
struct JsonReport<'a, T> {
    #[serde(flatten)]
    summary: scan2iiif::StageSummary,
    skipped: &'a [scan2iiif::output::SkippedItem],
    failed: &'a [scan2iiif::output::FailedItem],
    warnings: &'a [String],
    produced: &'a [T],
}

impl Reporter {
    fn stage<T: Serialize>(&self, report: &StageReport<T>) -> Result<ExitStatus> {
        if self.json {
            let view = JsonReport {
                summary: report.summary(),
                skipped: &report.skipped,
                failed: &report.failed,
                warnings: &report.warnings,
                produced: &report.produced,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&view).context("Failed to serialise report")?
            );
        } else if !self.quiet {
            for failed in &report.failed {
                eprintln!("  {} {}  {}", red("✗"), failed.item, failed.error);
            }
            self.summary_line(
                &report.stage,
                report.produced.len(),
                report.skipped.len(),
                report.failed.len(),
                report.warnings.len(),
                report.duration_ms,
            );
        }
        Ok(report.exit_status())
    }

    fn summary_line(
        &self,
        stage: &str,
        produced: usize,
        skipped: usize,
        failed: usize,
        warnings: usize,
        duration_ms: u64,
    ) {
        let mark = if failed > 0 {
            red("✘")
        } else if skipped > 0 || warnings > 0 {
            yellow("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{mark} {:<16} {} done  {} skipped  {} failed  {} warnings  {}",
            bold(stage),
            produced,
            skipped,
            failed,
            warnings,
            dim(&format!("{duration_ms}ms")),
        );
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(opts: &GlobalOpts, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let override_table = opts
        .override_table
        .clone()
        .unwrap_or_else(|| opts.output_root.join("scans_metadata_edited.tsv"));

    let mut builder = PipelineConfig::builder()
        .source_root(&opts.source_root)
        .output_root(&opts.output_root)
        .manifest_root(&opts.manifest_root)
        .override_table_path(override_table)
        .search_url(&opts.search_url)
        .url_prefix(&opts.url_prefix)
        .notebook_source_root(&opts.notebook_source_root)
        .notebook_markdown_root(&opts.notebook_markdown_root)
        .entity_finder_url(&opts.entity_finder_url)
        .density(opts.density)
        .jpeg_quality(opts.jpeg_quality)
        .raster_backend(opts.raster_backend.clone().into())
        .probe_backend(opts.probe_backend.clone().into())
        .tool_timeout_secs(opts.tool_timeout)
        .http_timeout_secs(opts.http_timeout)
        .max_retries(opts.max_retries)
        .skip_existing(opts.skip_existing);

    if let Some(ref base) = opts.manifest_base_url {
        builder = builder.manifest_base_url(base);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
