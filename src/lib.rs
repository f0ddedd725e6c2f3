//! # pdfconvert
//!
//! Convert PDF documents into page images (JPEG/PNG), a DOCX flow document
//! or an XLSX workbook, with progress reporting and cooperative
//! cancellation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF source (path / bytes / URL / custom opener)
//!  │
//!  ├─ 1. Input     copy into a private temp file (deleted when the job ends)
//!  ├─ 2. Engine    bind pdfium on a blocking worker thread
//!  ├─ 3. Assemble  per target:
//!  │       jpg/png  render → encode → page<N>.<ext>
//!  │       docx     per page: text paragraph + page picture
//!  │       xlsx     whole-document text, one row per line
//!  └─ 4. Output    Artifact { files, mime type, size } in a job-* directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfconvert::{convert, ConversionConfig, ConversionJob, SourceReference, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let job = ConversionJob::new(SourceReference::from_path("invoice.pdf"), TargetFormat::Xlsx);
//!     let artifact = convert(job, &ConversionConfig::default()).await?;
//!     println!("{} ({})", artifact.file_path().display(), artifact.mime_type());
//!     Ok(())
//! }
//! ```
//!
//! ## Progress and cancellation
//!
//! Progress values are clamped to `[0, 1]`, never decrease, and end with
//! exactly one `1.0` on success. Cancellation is polled between pages; a
//! cancelled job returns [`ConvertError::Cancelled`] and leaves no files
//! behind. See [`submit`] for a handle that bundles both.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfconvert = { version = "0.1", default-features = false }
//! ```
//!
//! ## Finding pdfium
//!
//! The pdfium shared library is looked up in
//! [`ConversionConfig::pdfium_lib_path`] when set, else in the current
//! directory, else on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, TargetFormat};
pub use convert::{convert, convert_sync, convert_with_engine, inspect, inspect_with_engine};
pub use error::ConvertError;
pub use job::{CancellationFlag, ConversionJob};
pub use output::{Artifact, ConversionStats, DocumentMetadata};
pub use pipeline::engine::{DocumentEngine, EngineFactory, PdfiumFactory};
pub use pipeline::input::{SourceOpener, SourceReference};
pub use pipeline::render::{PageDescriptor, RasterPage, RasterSession, Rasterizer};
pub use pipeline::text::{TextExtractor, TextSession};
pub use progress::{NoopProgress, ProgressCallback, ProgressSink};
pub use stream::{submit, submit_with_engine, ConversionHandle, ProgressStream};
