//! Progress reporting for conversion jobs.
//!
//! Callers inject an [`Arc<dyn ProgressSink>`] on the
//! [`crate::ConversionJob`]. The pipeline never talks to the sink directly:
//! every value goes through a [`ProgressReporter`], which enforces the
//! contract a UI can rely on:
//!
//! * values are clamped to `[0.0, 1.0]`
//! * values never decrease, and repeats are dropped
//! * `1.0` is delivered exactly once, and only when the job succeeds
//!
//! Assemblers may report `1.0` after their last page; the reporter holds it
//! back until the orchestrator calls [`ProgressReporter::finish`], so a job
//! that fails while writing its package never shows as complete.
//!
//! # Example
//!
//! ```rust
//! use pdfconvert::{ProgressSink, ProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = {
//!     let seen = Arc::clone(&seen);
//!     move |v: f32| seen.lock().unwrap().push(v)
//! };
//! let cb: ProgressCallback = Arc::new(sink);
//! cb.on_progress(0.5);
//! assert_eq!(*seen.lock().unwrap(), vec![0.5]);
//! ```

use std::sync::Arc;

/// Receives progress events from a conversion job.
///
/// Implementations must be `Send + Sync`: pages are processed on a blocking
/// worker thread, not on the thread that submitted the job. All methods
/// have no-op defaults so callers only override what they care about.
/// Any `Fn(f32) + Send + Sync` closure is a sink for [`Self::on_progress`].
pub trait ProgressSink: Send + Sync {
    /// Overall job progress in `[0.0, 1.0]`. Non-decreasing within a job.
    fn on_progress(&self, fraction: f32) {
        let _ = fraction;
    }

    /// Called once after the document is opened and before the first page.
    ///
    /// # Arguments
    /// * `total_pages`: page count of the opened document
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when all work for one page is done.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn on_progress(&self, fraction: f32) {
        self(fraction)
    }
}

/// A no-op sink for callers that don't need progress events.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

/// Convenience alias matching the type stored in [`crate::ConversionJob`].
pub type ProgressCallback = Arc<dyn ProgressSink>;

/// Fraction `done / total`, or `1.0` for an empty document.
pub fn fraction(done: f32, total: usize) -> f32 {
    if total == 0 {
        return 1.0;
    }
    (done / total as f32).clamp(0.0, 1.0)
}

/// Enforces the monotonic, bounded progress contract for one job.
pub struct ProgressReporter {
    sink: Option<ProgressCallback>,
    last: f32,
    holding_complete: bool,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(sink: Option<ProgressCallback>) -> Self {
        Self {
            sink,
            last: 0.0,
            holding_complete: false,
            finished: false,
        }
    }

    /// Report an intermediate value. Regressions, repeats and NaN are dropped;
    /// `1.0` is held until [`Self::finish`].
    pub fn report(&mut self, value: f32) {
        if value.is_nan() || self.finished {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if value >= 1.0 {
            self.holding_complete = true;
            return;
        }
        if value <= self.last {
            return;
        }
        self.last = value;
        if let Some(ref sink) = self.sink {
            sink.on_progress(value);
        }
    }

    /// Report `done / total` with the zero-page guard applied.
    pub fn report_pages(&mut self, done: f32, total: usize) {
        self.report(fraction(done, total));
    }

    pub fn conversion_start(&self, total_pages: usize) {
        if let Some(ref sink) = self.sink {
            sink.on_conversion_start(total_pages);
        }
    }

    pub fn page_complete(&self, page_num: usize, total_pages: usize) {
        if let Some(ref sink) = self.sink {
            sink.on_page_complete(page_num, total_pages);
        }
    }

    /// Deliver the terminal `1.0`. Idempotent.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.holding_complete = false;
        self.last = 1.0;
        if let Some(ref sink) = self.sink {
            sink.on_progress(1.0);
        }
    }

    /// The last value delivered to the sink (0.0 before the first).
    pub fn last(&self) -> f32 {
        self.last
    }

    /// `true` once an assembler has reported that all its work is done.
    pub fn is_holding_complete(&self) -> bool {
        self.holding_complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |v: f32| s.lock().unwrap().push(v));
        (cb, seen)
    }

    #[test]
    fn noop_sink_does_not_panic() {
        let cb = NoopProgress;
        cb.on_progress(0.5);
        cb.on_conversion_start(3);
        cb.on_page_complete(1, 3);
    }

    #[test]
    fn drops_regressions_and_repeats() {
        let (cb, seen) = recording();
        let mut r = ProgressReporter::new(Some(cb));
        r.report(0.2);
        r.report(0.1);
        r.report(0.2);
        r.report(0.4);
        r.report(f32::NAN);
        assert_eq!(*seen.lock().unwrap(), vec![0.2, 0.4]);
        assert_eq!(r.last(), 0.4);
    }

    #[test]
    fn clamps_and_holds_completion() {
        let (cb, seen) = recording();
        let mut r = ProgressReporter::new(Some(cb));
        r.report(-3.0);
        r.report(1.7);
        assert!(r.is_holding_complete());
        assert!(seen.lock().unwrap().is_empty());
        r.finish();
        r.finish();
        r.report(0.5);
        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn page_fraction_guards_zero_pages() {
        assert_eq!(fraction(0.0, 0), 1.0);
        assert_eq!(fraction(1.0, 4), 0.25);
        assert_eq!(fraction(9.0, 4), 1.0);
    }

    #[test]
    fn three_page_sequence() {
        let (cb, seen) = recording();
        let mut r = ProgressReporter::new(Some(cb));
        for i in 0..3 {
            r.report_pages((i + 1) as f32, 3);
        }
        r.finish();
        let v = seen.lock().unwrap().clone();
        assert_eq!(v.len(), 3);
        assert!((v[0] - 0.333).abs() < 0.001);
        assert!((v[1] - 0.667).abs() < 0.001);
        assert_eq!(v[2], 1.0);
    }

    struct CountingSink {
        starts: AtomicUsize,
        pages: AtomicUsize,
    }

    impl ProgressSink for CountingSink {
        fn on_conversion_start(&self, total_pages: usize) {
            self.starts.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize) {
            self.pages.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn forwards_page_events() {
        let sink = Arc::new(CountingSink {
            starts: AtomicUsize::new(0),
            pages: AtomicUsize::new(0),
        });
        let r = ProgressReporter::new(Some(sink.clone() as ProgressCallback));
        r.conversion_start(2);
        r.page_complete(1, 2);
        r.page_complete(2, 2);
        assert_eq!(sink.starts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.pages.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn reporter_without_sink_is_fine() {
        let mut r = ProgressReporter::new(None);
        r.report(0.5);
        r.finish();
        assert_eq!(r.last(), 1.0);
    }
}
