//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to be told
//! when each stage starts and finishes, and when an inference attempt is
//! retried. The CLI uses this to drive its spinner; a web front-end could
//! forward the same events over a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_cashflow::{AnalysisConfig, AnalysisProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Logger;
//!
//! impl AnalysisProgressCallback for Logger {
//!     fn on_stage_complete(&self, stage: Stage, detail: &str) {
//!         eprintln!("{stage}: {detail}");
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Logger))
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One step of the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Extract,
    Prompt,
    Inference,
    Parse,
    Aggregate,
    Narrative,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extract => "extracting text",
            Stage::Prompt => "building prompt",
            Stage::Inference => "extracting transactions",
            Stage::Parse => "validating transactions",
            Stage::Aggregate => "summarising cash flow",
            Stage::Narrative => "writing insights",
        };
        f.pad(s)
    }
}

/// Called by the pipeline as it moves through its stages.
///
/// All methods default to no-ops so implementors override only what they
/// need. Stages run sequentially, but the callback may be shared between
/// concurrent analyses, hence `Send + Sync`.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called when `stage` begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when `stage` finishes successfully.
    ///
    /// `detail` is a short human-readable summary such as `"3 pages"`.
    fn on_stage_complete(&self, stage: Stage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called before an inference retry.
    ///
    /// # Arguments
    /// * `attempt`    : the attempt about to run (1-based retry number)
    /// * `max_retries`: configured retry bound
    /// * `delay`      : backoff before the attempt
    /// * `error`      : why the previous attempt failed
    fn on_retry(&self, attempt: u32, max_retries: u32, delay: Duration, error: &str) {
        let _ = (attempt, max_retries, delay, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
