//! Progress-callback trait for per-item stage events.
//!
//! Inject an [`Arc<dyn StageProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as each stage works through its items.
//!
//! # Example
//!
//! ```rust
//! use scan2iiif::{PipelineConfig, StageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl StageProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: &str, item: &str) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{stage}: {item} done ({done} so far)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn StageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by every stage as it processes its items.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait StageProgressCallback: Send + Sync {
    /// Called once before the first item of a stage.
    ///
    /// # Arguments
    /// * `stage`       - stage name, e.g. `"assemble"`
    /// * `total_items` - number of candidate items discovered
    fn on_stage_start(&self, stage: &str, total_items: usize) {
        let _ = (stage, total_items);
    }

    /// Called just before an item is processed.
    fn on_item_start(&self, stage: &str, item: &str) {
        let _ = (stage, item);
    }

    /// Called when an item was fully processed and persisted.
    fn on_item_complete(&self, stage: &str, item: &str) {
        let _ = (stage, item);
    }

    /// Called when an item was skipped (malformed name, output already present).
    fn on_item_skipped(&self, stage: &str, item: &str, reason: &str) {
        let _ = (stage, item, reason);
    }

    /// Called when an item failed; the batch continues.
    fn on_item_error(&self, stage: &str, item: &str, error: &str) {
        let _ = (stage, item, error);
    }

    /// Called once after every item of a stage has been attempted.
    ///
    /// # Arguments
    /// * `succeeded` - items fully processed
    /// * `total_items` - items attempted, skipped ones included
    fn on_stage_complete(&self, stage: &str, succeeded: usize, total_items: usize) {
        let _ = (stage, succeeded, total_items);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn StageProgressCallback>;
