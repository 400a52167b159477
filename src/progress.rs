//! Progress-callback trait for page status observation.
//!
//! While a page is in flight its status must be visible to observers (a UI
//! page grid, a terminal progress bar) at every sub-stage, not just at the
//! end. Inject an `Arc<dyn PageProgressCallback>` via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive the
//! transition events as the pipeline drives each page.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, or a progress bar without the
//! library knowing how the host application communicates. The trait is
//! `Send + Sync`; with the current strictly sequential driver the methods are
//! never called concurrently, but implementations should not rely on that —
//! per-page concurrency is an anticipated extension.

use crate::page::PageStatus;
use std::sync::Arc;

/// Called by the pipeline as pages move through their stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PageProgressCallback: Send + Sync {
    /// Called once before the first page of a batch starts.
    fn on_batch_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called on every status transition of a page, including the terminal
    /// one. `page_id` is the page's index within the job.
    fn on_stage_change(&self, page_id: usize, status: PageStatus) {
        let _ = (page_id, status);
    }

    /// Called when a page reaches a terminal status.
    fn on_page_finished(&self, page_id: usize, status: PageStatus) {
        let _ = (page_id, status);
    }

    /// Called once after the last page of a batch finished.
    fn on_batch_complete(&self, total_pages: usize, completed: usize) {
        let _ = (total_pages, completed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PageProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        transitions: Mutex<Vec<(usize, PageStatus)>>,
        finished: AtomicUsize,
    }

    impl PageProgressCallback for TrackingCallback {
        fn on_stage_change(&self, page_id: usize, status: PageStatus) {
            self.transitions.lock().unwrap().push((page_id, status));
        }

        fn on_page_finished(&self, _page_id: usize, _status: PageStatus) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_stage_change(0, PageStatus::Analyzing);
        cb.on_page_finished(0, PageStatus::Done);
        cb.on_batch_complete(3, 3);
    }

    #[test]
    fn tracking_callback_records_transitions() {
        let cb = TrackingCallback::default();
        cb.on_stage_change(1, PageStatus::Analyzing);
        cb.on_stage_change(1, PageStatus::Cleaning);
        cb.on_stage_change(1, PageStatus::Done);
        cb.on_page_finished(1, PageStatus::Done);

        let seen = cb.transitions.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (1, PageStatus::Analyzing),
                (1, PageStatus::Cleaning),
                (1, PageStatus::Done)
            ]
        );
        assert_eq!(cb.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn PageProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_batch_start(2);
        cb.on_stage_change(0, PageStatus::Cleaning);
    }
}
