//! Stage outcome types.
//!
//! Every stage returns a [`StageReport`] carrying the artifacts it produced
//! (so a composed run can hand them straight to the next stage) plus every
//! item it skipped or failed on. The report decides the process exit status.

use crate::error::ItemError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// An item the stage deliberately did not process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub item: String,
    pub reason: String,
}

/// An item whose processing failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub item: String,
    pub error: ItemError,
}

/// Outcome of one stage run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport<T> {
    /// Stage name, e.g. `"manifest"`.
    pub stage: String,
    /// Artifacts produced, in processing order.
    pub produced: Vec<T>,
    pub skipped: Vec<SkippedItem>,
    pub failed: Vec<FailedItem>,
    /// Non-fatal observations (long transcripts, missing description files).
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl<T> StageReport<T> {
    /// Whether every item went through without skip, failure or warning.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty() && self.warnings.is_empty()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.is_clean() {
            ExitStatus::Success
        } else {
            ExitStatus::Partial
        }
    }

    /// Drop the artifacts, keeping only counts and diagnostics.
    pub fn summary(&self) -> StageSummary {
        StageSummary {
            stage: self.stage.clone(),
            produced: self.produced.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
            warnings: self.warnings.len(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Artifact-free view of a [`StageReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: String,
    pub produced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

/// Process exit status derived from stage outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExitStatus {
    /// Every item processed.
    Success,
    /// Some items skipped, failed or warned.
    Partial,
    /// Configuration or I/O error aborted a stage.
    Fatal,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Partial => 1,
            ExitStatus::Fatal => 2,
        }
    }

    /// The worse of two statuses.
    pub fn combine(self, other: ExitStatus) -> ExitStatus {
        self.max(other)
    }
}

/// Builds a [`StageReport`] while firing progress events and log lines.
pub(crate) struct StageRecorder<T> {
    report: StageReport<T>,
    progress: Option<ProgressCallback>,
    started: Instant,
    attempted: usize,
}

impl<T> StageRecorder<T> {
    pub(crate) fn start(stage: &str, total: usize, progress: Option<ProgressCallback>) -> Self {
        info!(stage, total, "stage started");
        if let Some(ref cb) = progress {
            cb.on_stage_start(stage, total);
        }
        Self {
            report: StageReport {
                stage: stage.to_string(),
                produced: Vec::new(),
                skipped: Vec::new(),
                failed: Vec::new(),
                warnings: Vec::new(),
                duration_ms: 0,
            },
            progress,
            started: Instant::now(),
            attempted: 0,
        }
    }

    pub(crate) fn item_start(&self, item: &str) {
        debug!(stage = %self.report.stage, item, "processing");
        if let Some(ref cb) = self.progress {
            cb.on_item_start(&self.report.stage, item);
        }
    }

    pub(crate) fn complete(&mut self, item: &str, artifact: T) {
        self.attempted += 1;
        debug!(stage = %self.report.stage, item, "done");
        if let Some(ref cb) = self.progress {
            cb.on_item_complete(&self.report.stage, item);
        }
        self.report.produced.push(artifact);
    }

    pub(crate) fn skip(&mut self, item: &str, reason: impl Into<String>) {
        let reason = reason.into();
        self.attempted += 1;
        warn!(stage = %self.report.stage, item, %reason, "skipping");
        if let Some(ref cb) = self.progress {
            cb.on_item_skipped(&self.report.stage, item, &reason);
        }
        self.report.skipped.push(SkippedItem {
            item: item.to_string(),
            reason,
        });
    }

    pub(crate) fn fail(&mut self, item: &str, error: ItemError) {
        self.attempted += 1;
        warn!(stage = %self.report.stage, item, error = %error, "item failed");
        if let Some(ref cb) = self.progress {
            cb.on_item_error(&self.report.stage, item, &error.to_string());
        }
        self.report.failed.push(FailedItem {
            item: item.to_string(),
            error,
        });
    }

    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(stage = %self.report.stage, "{}", message);
        self.report.warnings.push(message);
    }

    pub(crate) fn finish(mut self) -> StageReport<T> {
        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        let succeeded = self.report.produced.len();
        info!(
            stage = %self.report.stage,
            succeeded,
            skipped = self.report.skipped.len(),
            failed = self.report.failed.len(),
            duration_ms = self.report.duration_ms,
            "stage complete"
        );
        if let Some(ref cb) = self.progress {
            cb.on_stage_complete(&self.report.stage, succeeded, self.attempted);
        }
        self.report
    }
}
