//! A conversion job: what to convert, into what, and how to observe or stop it.

use crate::config::TargetFormat;
use crate::error::ConvertError;
use crate::pipeline::input::SourceReference;
use crate::progress::ProgressCallback;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, cooperative cancellation flag.
///
/// Clones share the same flag. The pipeline polls it before the source copy,
/// before opening the document, before whole-document extraction and at the
/// start of every page; setting it never interrupts work already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(ConvertError::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// One unit of work: a source, a target format and the caller's hooks.
///
/// # Example
/// ```rust
/// use pdfconvert::{CancellationFlag, ConversionJob, SourceReference, TargetFormat};
///
/// let cancel = CancellationFlag::new();
/// let job = ConversionJob::new(SourceReference::from_path("report.pdf"), TargetFormat::Png)
///     .with_progress(|v: f32| println!("{:.0}%", v * 100.0))
///     .with_cancellation(cancel.clone());
/// assert_eq!(job.target(), TargetFormat::Png);
/// ```
#[derive(Clone)]
pub struct ConversionJob {
    pub(crate) source: SourceReference,
    pub(crate) target: TargetFormat,
    pub(crate) progress: Option<ProgressCallback>,
    pub(crate) cancel: CancellationFlag,
}

impl ConversionJob {
    pub fn new(source: SourceReference, target: TargetFormat) -> Self {
        Self {
            source,
            target,
            progress: None,
            cancel: CancellationFlag::new(),
        }
    }

    /// Attach a progress sink. Any `Fn(f32) + Send + Sync` closure works.
    pub fn with_progress(mut self, sink: impl crate::progress::ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Attach an already shared sink.
    pub fn with_progress_callback(mut self, sink: ProgressCallback) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn source(&self) -> &SourceReference {
        &self.source
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// The job's cancellation flag; cancelling a clone cancels the job.
    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancel
    }
}

impl std::fmt::Debug for ConversionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionJob")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("progress", &self.progress.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let a = CancellationFlag::new();
        let b = a.clone();
        assert!(a.check().is_ok());
        b.cancel();
        assert!(a.is_cancelled());
        assert!(a.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn job_uses_the_given_flag() {
        let flag = CancellationFlag::new();
        let job = ConversionJob::new(SourceReference::from_bytes(b"%PDF".to_vec()), TargetFormat::Xlsx)
            .with_cancellation(flag.clone());
        flag.cancel();
        assert!(job.cancellation().is_cancelled());
        assert!(format!("{job:?}").contains("cancelled: true"));
    }
}
