//! Stage entry points wired to the production collaborators.
//!
//! The functions in [`crate::pipeline`] take their collaborators as trait
//! objects. [`Collaborators::from_config`] builds the real ones once
//! (ImageMagick or pdfium, pandoc, the configured probe, Solr, GNRD) and
//! [`run_pipeline`] drives the scan stages end to end, handing each stage's
//! output to the next in memory.

use crate::config::PipelineConfig;
use crate::error::ArchiveError;
use crate::output::{ExitStatus, StageReport, StageSummary};
use crate::pipeline::{assemble, describe, index, manifest, rasterize};
use crate::search::{EntityExtractor, GnrdClient, SearchClient, SolrClient};
use crate::tools::{self, DocumentConverter, ImageProbe, PandocConverter, RasterizeTool};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Every external collaborator a stage may need.
#[derive(Clone)]
pub struct Collaborators {
    pub rasterizer: Arc<dyn RasterizeTool>,
    pub converter: Arc<dyn DocumentConverter>,
    pub probe: Arc<dyn ImageProbe>,
    pub search: Arc<dyn SearchClient>,
    pub entities: Arc<dyn EntityExtractor>,
}

impl Collaborators {
    /// Production implementations selected by `config`.
    ///
    /// Builds HTTP clients but makes no network calls.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ArchiveError> {
        Ok(Self {
            rasterizer: tools::rasterizer_for(config),
            converter: Arc::new(PandocConverter::from_config(config)),
            probe: tools::probe_for(config),
            search: Arc::new(SolrClient::from_config(config)?),
            entities: Arc::new(GnrdClient::from_config(config)?),
        })
    }
}

/// Which scan stages [`run_pipeline`] executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSteps {
    pub rasterize: bool,
    pub describe: bool,
    pub manifest: bool,
    pub index: bool,
}

impl Default for PipelineSteps {
    fn default() -> Self {
        Self {
            rasterize: true,
            describe: true,
            manifest: true,
            index: true,
        }
    }
}

/// Outcome of a composed run: one summary per executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub stages: Vec<StageSummary>,
    pub exit_status: ExitStatus,
}

impl PipelineReport {
    fn push<T>(&mut self, report: &StageReport<T>) {
        self.exit_status = self.exit_status.combine(report.exit_status());
        self.stages.push(report.summary());
    }
}

/// Run rasterize → describe → assemble → manifest → index.
///
/// Assembly always runs; it is the hub the later stages consume. The records
/// it produces are handed directly to the manifest and index stages instead
/// of being rediscovered on disk. A fatal error in any stage aborts the run.
pub async fn run_pipeline(
    config: &PipelineConfig,
    tools: &Collaborators,
    steps: PipelineSteps,
) -> Result<PipelineReport, ArchiveError> {
    let mut report = PipelineReport {
        stages: Vec::new(),
        exit_status: ExitStatus::Success,
    };

    if steps.rasterize {
        let stage = rasterize::rasterize_all(config, tools.rasterizer.as_ref()).await?;
        report.push(&stage);
    }
    if steps.describe {
        let stage = describe::describe_all(config, tools.converter.as_ref()).await?;
        report.push(&stage);
    }

    let records = assemble::assemble_all(config)?;
    report.push(&records);

    if steps.manifest {
        let stage =
            manifest::build_manifests(config, Some(&records.produced), tools.probe.as_ref())
                .await?;
        report.push(&stage);
    }
    if steps.index {
        let stage = index::index_records(
            config,
            Some(&records.produced),
            tools.search.as_ref(),
            tools.entities.as_ref(),
            Utc::now(),
        )
        .await?;
        report.push(&stage);
    }

    info!(
        stages = report.stages.len(),
        exit = report.exit_status.code(),
        "pipeline finished"
    );
    Ok(report)
}
