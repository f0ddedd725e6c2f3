//! Conversion entry points.
//!
//! [`convert`] runs one [`ConversionJob`] to completion and returns its
//! [`Artifact`]. The source copy is async I/O on the caller's runtime; the
//! page loop runs inside `spawn_blocking` because pdfium is a blocking
//! native library. Use [`crate::stream::submit`] instead to run the job in
//! the background with a progress stream and a cancel handle.
//!
//! ## Resource lifetimes
//!
//! | Resource | Owner | Released |
//! |----------|-------|----------|
//! | local copy of the source | [`LocalDocument`] | end of the blocking task |
//! | engine + sessions | the blocking task | before it returns |
//! | `job-*` output directory | a `TempDir` | kept on success, deleted otherwise |

use crate::config::{ConversionConfig, TargetFormat};
use crate::error::ConvertError;
use crate::job::{CancellationFlag, ConversionJob};
use crate::output::{Artifact, DocumentMetadata};
use crate::pipeline::assemble::{assembler_for, AssemblyContext, AssemblyOutput};
use crate::pipeline::engine::{EngineFactory, PdfiumFactory};
use crate::pipeline::input::{self, LocalDocument, SourceReference};
use crate::progress::ProgressReporter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a document with the pdfium engine.
///
/// # Returns
/// The [`Artifact`] listing the written files. Progress ends with exactly one
/// `1.0`, delivered just before this returns.
///
/// # Errors
/// Exactly one [`ConvertError`]; check [`ConvertError::is_cancelled`] to tell
/// a cancelled job from a failed one. Either way the job's output directory
/// and the local copy of the source are gone by the time this returns.
///
/// # Example
/// ```rust,no_run
/// use pdfconvert::{convert, ConversionConfig, ConversionJob, SourceReference, TargetFormat};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let job = ConversionJob::new(SourceReference::from_path("report.pdf"), TargetFormat::Docx)
///     .with_progress(|v: f32| eprintln!("{:>3.0}%", v * 100.0));
/// let artifact = convert(job, &ConversionConfig::default()).await?;
/// println!("{} ({} bytes)", artifact.file_path().display(), artifact.byte_size());
/// # Ok(())
/// # }
/// ```
pub async fn convert(job: ConversionJob, config: &ConversionConfig) -> Result<Artifact, ConvertError> {
    let factory: Arc<dyn EngineFactory> = Arc::new(PdfiumFactory::from_config(config));
    convert_with_engine(job, config, factory).await
}

/// [`convert`] with a caller-supplied engine.
pub async fn convert_with_engine(
    job: ConversionJob,
    config: &ConversionConfig,
    factory: Arc<dyn EngineFactory>,
) -> Result<Artifact, ConvertError> {
    let start = Instant::now();
    let ConversionJob {
        source,
        target,
        progress,
        cancel,
    } = job;
    let name = source.display_name();
    info!("Starting conversion: {} → {}", name, target);

    let result = run(source, target, progress, cancel, config, factory, start).await;
    match &result {
        Ok(artifact) => info!(
            "Conversion complete: {} → {} file(s), {} bytes, {}ms",
            name,
            artifact.files().len(),
            artifact.byte_size(),
            artifact.stats().duration_ms
        ),
        Err(e) if e.is_cancelled() => warn!("Conversion of {} cancelled", name),
        Err(e) => warn!("Conversion of {} failed: {}", name, e),
    }
    result
}

async fn run(
    source: SourceReference,
    target: TargetFormat,
    progress: Option<crate::progress::ProgressCallback>,
    cancel: CancellationFlag,
    config: &ConversionConfig,
    factory: Arc<dyn EngineFactory>,
    start: Instant,
) -> Result<Artifact, ConvertError> {
    let mut reporter = ProgressReporter::new(progress);

    // ── Step 1: Copy the source ──────────────────────────────────────────
    cancel.check()?;
    let document = input::load_source(&source, config).await?;
    cancel.check()?;

    // ── Step 2: Job-scoped output directory ──────────────────────────────
    tokio::fs::create_dir_all(&config.output_root)
        .await
        .map_err(|e| ConvertError::write_failure(&config.output_root, e))?;
    let job_dir = tempfile::Builder::new()
        .prefix("job-")
        .tempdir_in(&config.output_root)
        .map_err(|e| ConvertError::write_failure(&config.output_root, e))?;
    debug!("Job directory: {}", job_dir.path().display());

    // ── Step 3: Assemble on a blocking thread ────────────────────────────
    let output_dir = job_dir.path().to_path_buf();
    let task_config = config.clone();
    let task_cancel = cancel.clone();
    let (result, mut reporter) = tokio::task::spawn_blocking(move || {
        let result = assemble(
            target,
            &document,
            factory.as_ref(),
            &task_config,
            &output_dir,
            &mut reporter,
            &task_cancel,
        );
        drop(document);
        (result, reporter)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))?;

    // `job_dir` still owns the directory: any error below removes it.
    let mut output = result?;
    output.stats.duration_ms = start.elapsed().as_millis() as u64;
    let artifact = Artifact::from_files(output.files, target, output.page_count)?
        .with_stats(output.stats);

    let kept = job_dir.keep();
    debug!("Keeping job directory {}", kept.display());
    reporter.finish();
    Ok(artifact)
}

/// Everything that needs the engine. Runs on the blocking pool; the engine
/// and its sessions are created and dropped here.
fn assemble(
    target: TargetFormat,
    document: &LocalDocument,
    factory: &dyn EngineFactory,
    config: &ConversionConfig,
    output_dir: &Path,
    progress: &mut ProgressReporter,
    cancel: &CancellationFlag,
) -> Result<AssemblyOutput, ConvertError> {
    cancel.check()?;
    let engine = factory.create()?;
    let assembler = assembler_for(target);
    let mut ctx = AssemblyContext {
        document,
        engine: engine.as_ref(),
        config,
        output_dir,
        progress,
        cancel,
    };
    assembler.assemble(&mut ctx)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn convert_sync(job: ConversionJob, config: &ConversionConfig) -> Result<Artifact, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(job, config))
}

/// Read document metadata without converting.
pub async fn inspect(
    source: &SourceReference,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, ConvertError> {
    let factory: Arc<dyn EngineFactory> = Arc::new(PdfiumFactory::from_config(config));
    inspect_with_engine(source, config, factory).await
}

/// [`inspect`] with a caller-supplied engine.
pub async fn inspect_with_engine(
    source: &SourceReference,
    config: &ConversionConfig,
    factory: Arc<dyn EngineFactory>,
) -> Result<DocumentMetadata, ConvertError> {
    let document = input::load_source(source, config).await?;
    let metadata = tokio::task::spawn_blocking(move || {
        let engine = factory.create()?;
        engine.metadata(&document)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Inspect task panicked: {e}")))??;

    info!(
        "Inspected {}: {} pages, PDF {}",
        source.display_name(),
        metadata.page_count,
        metadata.pdf_version
    );
    Ok(metadata)
}
