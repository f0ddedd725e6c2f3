//! Background submission: run a job on the runtime and observe it.
//!
//! [`submit`] spawns the job and returns a [`ConversionHandle`] right away.
//! The handle exposes the job's progress as a `Stream` of fractions, a
//! [`ConversionHandle::cancel`] method, and [`ConversionHandle::join`] to
//! await the [`Artifact`].
//!
//! The progress stream yields the same values the job's own sink sees (if it
//! has one) and ends when the job ends. On success its last item is `1.0`;
//! after a failure or a cancellation it simply stops.
//!
//! Dropping the handle detaches the job; it keeps running to completion.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::job::{CancellationFlag, ConversionJob};
use crate::output::Artifact;
use crate::pipeline::engine::{EngineFactory, PdfiumFactory};
use crate::progress::{ProgressCallback, ProgressSink};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::debug;

/// A boxed stream of progress fractions.
pub type ProgressStream = Pin<Box<dyn Stream<Item = f32> + Send>>;

/// A running job.
pub struct ConversionHandle {
    progress: Option<ProgressStream>,
    cancel: CancellationFlag,
    task: JoinHandle<Result<Artifact, ConvertError>>,
}

impl ConversionHandle {
    /// Take the progress stream. Returns `None` after the first call.
    pub fn progress(&mut self) -> Option<ProgressStream> {
        self.progress.take()
    }

    /// Request cooperative cancellation. The job stops at its next
    /// checkpoint and [`Self::join`] returns [`ConvertError::Cancelled`].
    pub fn cancel(&self) {
        debug!("Cancellation requested");
        self.cancel.cancel();
    }

    /// A clone of the job's cancellation flag, e.g. for a Ctrl-C handler.
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// `true` once the job has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job's outcome.
    pub async fn join(self) -> Result<Artifact, ConvertError> {
        self.task
            .await
            .map_err(|e| ConvertError::Internal(format!("Conversion task failed: {e}")))?
    }
}

/// Forwards every event to the handle's channel and to the job's own sink.
struct ChannelSink {
    tx: mpsc::UnboundedSender<f32>,
    inner: Option<ProgressCallback>,
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, fraction: f32) {
        // The receiver may already be gone; the job carries on regardless.
        let _ = self.tx.send(fraction);
        if let Some(ref inner) = self.inner {
            inner.on_progress(fraction);
        }
    }

    fn on_conversion_start(&self, total_pages: usize) {
        if let Some(ref inner) = self.inner {
            inner.on_conversion_start(total_pages);
        }
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        if let Some(ref inner) = self.inner {
            inner.on_page_complete(page_num, total_pages);
        }
    }
}

/// Spawn `job` with the pdfium engine. Must be called within a tokio runtime.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use pdfconvert::{submit, ConversionConfig, ConversionJob, SourceReference, TargetFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = ConversionJob::new(SourceReference::from_path("scan.pdf"), TargetFormat::Png);
/// let mut handle = submit(job, &ConversionConfig::default());
/// if let Some(mut progress) = handle.progress() {
///     while let Some(v) = progress.next().await {
///         eprintln!("{:>3.0}%", v * 100.0);
///     }
/// }
/// let artifact = handle.join().await?;
/// println!("{} page image(s)", artifact.files().len());
/// # Ok(())
/// # }
/// ```
pub fn submit(job: ConversionJob, config: &ConversionConfig) -> ConversionHandle {
    let factory: Arc<dyn EngineFactory> = Arc::new(PdfiumFactory::from_config(config));
    submit_with_engine(job, config, factory)
}

/// [`submit`] with a caller-supplied engine.
pub fn submit_with_engine(
    job: ConversionJob,
    config: &ConversionConfig,
    factory: Arc<dyn EngineFactory>,
) -> ConversionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = job.cancellation().clone();
    let sink = ChannelSink {
        tx,
        inner: job.progress.clone(),
    };
    let job = job.with_progress(sink);
    let config = config.clone();

    let task = tokio::spawn(async move {
        crate::convert::convert_with_engine(job, &config, factory).await
    });

    ConversionHandle {
        progress: Some(Box::pin(UnboundedReceiverStream::new(rx))),
        cancel,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::Mutex;

    #[test]
    fn channel_sink_forwards_to_stream_and_inner_sink() {
        let (tx, rx) = mpsc::unbounded_channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner: ProgressCallback = {
            let seen = Arc::clone(&seen);
            Arc::new(move |v: f32| seen.lock().unwrap().push(v))
        };
        let sink = ChannelSink {
            tx,
            inner: Some(inner),
        };
        sink.on_progress(0.25);
        sink.on_progress(1.0);
        drop(sink);

        let streamed: Vec<f32> = tokio_test::block_on(UnboundedReceiverStream::new(rx).collect());
        assert_eq!(streamed, vec![0.25, 1.0]);
        assert_eq!(*seen.lock().unwrap(), vec![0.25, 1.0]);
    }

    #[test]
    fn dropped_receiver_does_not_break_the_job() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink { tx, inner: None };
        sink.on_progress(0.5);
        sink.on_conversion_start(3);
        sink.on_page_complete(1, 3);
    }
}
