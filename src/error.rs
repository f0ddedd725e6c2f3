//! Error types for the pdfconvert library.
//!
//! Every conversion either returns an [`crate::output::Artifact`] or exactly
//! one [`ConvertError`]. There is no partial-success mode: a page that fails
//! to render aborts the job, because a raster set or package with a hole in
//! it is not useful to the caller. The failing page index is kept in the
//! error so it can still be reported.
//!
//! [`ConvertError::Cancelled`] is a terminal outcome rather than a failure;
//! use [`ConvertError::is_cancelled`] to tell the two apart.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdfconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source stream could not be opened or fully copied.
    #[error("Cannot read source '{name}': {reason}\nCheck the file exists, is readable, and was not truncated.")]
    SourceUnreadable { name: String, reason: String },

    /// The requested target format has no assembler.
    #[error("Unsupported target format '{target}'\nSupported: jpg, png, docx, xlsx.")]
    UnsupportedTarget { target: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The engine could not parse the document (or one of its text layers).
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document has no pages, so there is nothing to rasterise.
    #[error("PDF '{path}' has no pages; nothing to rasterise")]
    EmptyDocument { path: PathBuf },

    /// A single page failed to rasterise. `page_index` is 0-based.
    #[error("Rasterisation failed for page {} (index {page_index}): {detail}", page_index + 1)]
    RenderFailure { page_index: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or fully write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Terminal outcome ──────────────────────────────────────────────────
    /// Cooperative cancellation was observed at a checkpoint.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Engine binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium.\n"
    )]
    EngineUnavailable(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// `true` when the job stopped because cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConvertError::Cancelled)
    }

    /// The 0-based page index associated with this error, if any.
    pub fn page_index(&self) -> Option<usize> {
        match self {
            ConvertError::RenderFailure { page_index, .. } => Some(*page_index),
            _ => None,
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Wrap a non-io encoder error (docx, xlsx, image) as a write failure.
    pub(crate) fn write_failure_msg(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        ConvertError::WriteFailure {
            path: path.into(),
            source: std::io::Error::other(detail.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failure_display_is_one_based() {
        let e = ConvertError::RenderFailure {
            page_index: 2,
            detail: "bad stream".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("index 2"), "got: {msg}");
        assert_eq!(e.page_index(), Some(2));
    }

    #[test]
    fn cancelled_is_distinct() {
        assert!(ConvertError::Cancelled.is_cancelled());
        assert!(!ConvertError::Internal("x".into()).is_cancelled());
        assert_eq!(ConvertError::Cancelled.page_index(), None);
    }

    #[test]
    fn unsupported_target_lists_formats() {
        let e = ConvertError::UnsupportedTarget {
            target: "pptx".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pptx"));
        assert!(msg.contains("docx"));
    }

    #[test]
    fn write_failure_keeps_source() {
        use std::error::Error as _;
        let e = ConvertError::write_failure_msg("/tmp/out.docx", "zip error");
        assert!(e.source().is_some());
        assert!(e.to_string().contains("out.docx"));
    }
}
