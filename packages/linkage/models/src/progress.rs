//! Progress reporting for the per-target linkage pass.
//!
//! The join walks every distinct casualty location once; callers that want
//! feedback (the CLI's progress bars) plug in a [`ProgressCallback`], while
//! library users and tests pass [`null_progress`].

use std::sync::Arc;

/// Receives progress updates from a long-running linkage pass.
///
/// Implementations must be `Send + Sync` so a single callback can be shared
/// behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the total number of units (targets) to process.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the pass as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every update.
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
