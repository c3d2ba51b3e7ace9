//! Progress reporting for batch loading and enrichment stages.
//!
//! [`ProgressCallback`] decouples progress reporting from any rendering
//! backend. The CLI supplies `indicatif` bars; library callers and tests use
//! [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from long-running work.
///
/// Implementations must be `Send + Sync` because updates arrive from rayon
/// worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
