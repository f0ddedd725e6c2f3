//! Plain-text extraction, per page or for the whole document.
//!
//! Extraction is linear and best-effort: whatever the engine's text layer
//! yields, in its order. No columns, tables or reading order are inferred.
//! A page with no text layer (a scan) yields an empty string, which is a
//! valid result and never an error.

use crate::error::ConvertError;
use crate::pipeline::engine::PdfiumEngine;
use crate::pipeline::input::LocalDocument;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Opens documents for text extraction.
pub trait TextExtractor {
    fn open_text<'a>(
        &'a self,
        document: &LocalDocument,
    ) -> Result<Box<dyn TextSession + 'a>, ConvertError>;
}

/// An open document that can yield text.
pub trait TextSession {
    fn page_count(&self) -> usize;

    /// Text of page `index`, lines separated by `\n` or `\r\n`.
    fn extract_page(&self, index: usize) -> Result<String, ConvertError>;

    /// Text of the whole document, pages joined by a newline.
    fn extract_all(&self) -> Result<String, ConvertError> {
        let mut out = String::new();
        for index in 0..self.page_count() {
            let text = self.extract_page(index)?;
            out.push_str(&text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }
}

/// Split extracted text into the lines written to the tabular target.
///
/// `\n` and `\r\n` both end a line; a trailing terminator does not produce
/// an extra empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

// ── pdfium implementation ────────────────────────────────────────────────

pub(crate) struct PdfiumTextSession<'a> {
    document: PdfDocument<'a>,
    path: PathBuf,
    page_count: usize,
}

impl TextExtractor for PdfiumEngine {
    fn open_text<'a>(
        &'a self,
        document: &LocalDocument,
    ) -> Result<Box<dyn TextSession + 'a>, ConvertError> {
        let pdf = self.load(document.path())?;
        let page_count = pdf.pages().len() as usize;
        info!("PDF loaded for text extraction: {} pages", page_count);
        Ok(Box::new(PdfiumTextSession {
            document: pdf,
            path: document.path().to_path_buf(),
            page_count,
        }))
    }
}

impl TextSession for PdfiumTextSession<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn extract_page(&self, index: usize) -> Result<String, ConvertError> {
        let corrupt = |detail: String| ConvertError::CorruptDocument {
            path: self.path.clone(),
            detail: format!("text layer of page {}: {}", index + 1, detail),
        };
        let idx = u16::try_from(index).map_err(|_| corrupt("page index out of range".into()))?;
        let page = self
            .document
            .pages()
            .get(idx)
            .map_err(|e| corrupt(format!("{:?}", e)))?;
        let text = page.text().map_err(|e| corrupt(format!("{:?}", e)))?.all();
        debug!("Extracted {} chars from page {}", text.len(), index + 1);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(Vec<&'static str>);

    impl TextSession for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn extract_page(&self, index: usize) -> Result<String, ConvertError> {
            Ok(self.0[index].to_string())
        }
    }

    #[test]
    fn extract_all_joins_pages_with_newline() {
        let s = Pages(vec!["one\ntwo", "three\n", ""]);
        assert_eq!(s.extract_all().unwrap(), "one\ntwo\nthree\n\n");
    }

    #[test]
    fn extract_all_of_empty_document_is_empty() {
        assert_eq!(Pages(vec![]).extract_all().unwrap(), "");
    }

    #[test]
    fn split_lines_handles_crlf() {
        assert_eq!(split_lines("a\r\nb\nc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }
}
