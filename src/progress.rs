//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::AppealConfigBuilder::progress_callback`] to be told when
//! each step of `analyze_fine` / `generate_appeal` starts, finishes or fails.
//! The CLI uses it to drive a spinner; a service could forward it to a
//! WebSocket. The library knows nothing about how events are displayed.
//!
//! # Example
//!
//! ```rust
//! use fine_appeal::{AppealConfig, PipelineProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = AppealConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    Extract,
    Infer,
    Parse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "validate",
            Stage::Extract => "extract",
            Stage::Infer => "infer",
            Stage::Parse => "parse",
        })
    }
}

/// Called by [`crate::compose::AppealComposer`] around each stage.
///
/// Implementations must be `Send + Sync`: concurrent requests share one
/// configuration and therefore one callback. All methods default to no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before a stage runs.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage succeeds.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails; the pipeline aborts right after.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AppealConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for RecordingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }

        fn on_stage_error(&self, stage: Stage, error: &str) {
            self.events.lock().unwrap().push(format!("error:{stage}:{error}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Validate);
        cb.on_stage_complete(Stage::Validate, 1);
        cb.on_stage_error(Stage::Infer, "boom");
    }

    #[test]
    fn recording_callback_sees_overridden_events_only() {
        let cb = RecordingCallback::default();
        cb.on_stage_start(Stage::Extract);
        cb.on_stage_complete(Stage::Extract, 12);
        cb.on_stage_error(Stage::Parse, "bad json");
        let events = cb.events.lock().unwrap();
        assert_eq!(*events, vec!["start:extract", "error:parse:bad json"]);
    }
}
