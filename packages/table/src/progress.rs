//! Progress reporting for the pipeline's sequential loops.
//!
//! Stages report through [`ProgressCallback`] so they never depend on a
//! terminal renderer; binaries plug in `indicatif` bars, tests use
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running stage.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of work units (e.g. monthly periods).
    fn set_total(&self, total: u64);

    /// Advances by `delta` units.
    fn inc(&self, delta: u64);

    /// Replaces the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Marks the work as complete.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Shared [`NullProgress`] for callers that want no output.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
