//! Result types: the [`Artifact`] a job produces and the
//! [`DocumentMetadata`] returned by [`crate::inspect`].

use crate::config::TargetFormat;
use crate::error::ConvertError;
use crate::pipeline::render::PageDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The successful output of a conversion job.
///
/// Single-file targets (DOCX, XLSX) hold one file. Raster targets hold one
/// file per page, in page order; [`Artifact::file_path`] returns the first,
/// [`Artifact::files`] all of them.
///
/// Files live in a job-scoped directory under
/// [`crate::ConversionConfig::output_root`]; moving them somewhere durable is
/// the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    files: Vec<PathBuf>,
    mime_type: String,
    byte_size: u64,
    target: TargetFormat,
    page_count: usize,
    #[serde(default)]
    stats: ConversionStats,
}

/// Counters collected while assembling, for logs and the CLI's JSON output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages rendered into an image (raster files or embedded pictures).
    pub images_written: usize,
    /// Non-empty text blocks written to a flow document.
    pub text_blocks: usize,
    /// Rows written to a worksheet.
    pub rows_written: usize,
    /// Wall-clock time of the whole job, in milliseconds.
    pub duration_ms: u64,
}

impl Artifact {
    /// Build an artifact from files already written to disk.
    ///
    /// `byte_size` is the sum of the files' sizes as reported by the file
    /// system, so a missing file is a [`ConvertError::WriteFailure`].
    pub fn from_files(
        files: Vec<PathBuf>,
        target: TargetFormat,
        page_count: usize,
    ) -> Result<Self, ConvertError> {
        if files.is_empty() {
            return Err(ConvertError::Internal(
                "artifact must contain at least one file".into(),
            ));
        }
        let mut byte_size = 0u64;
        for f in &files {
            let meta = std::fs::metadata(f).map_err(|e| ConvertError::write_failure(f, e))?;
            byte_size += meta.len();
        }
        Ok(Self {
            files,
            mime_type: target.mime_type().to_string(),
            byte_size,
            target,
            page_count,
            stats: ConversionStats::default(),
        })
    }

    pub(crate) fn with_stats(mut self, stats: ConversionStats) -> Self {
        self.stats = stats;
        self
    }

    /// The representative output file (the only file, or page 1).
    pub fn file_path(&self) -> &Path {
        &self.files[0]
    }

    /// Every output file, in page order for raster targets.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Total size of all files in bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Page count of the source document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// The job-scoped directory holding the files.
    pub fn output_dir(&self) -> Option<&Path> {
        self.file_path().parent()
    }
}

/// Document-level metadata, available without converting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Page sizes in points, in page order.
    pub pages: Vec<PageDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_sums_file_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("page1.png");
        let b = dir.path().join("page2.png");
        std::fs::write(&a, [0u8; 10]).unwrap();
        std::fs::write(&b, [0u8; 5]).unwrap();

        let art = Artifact::from_files(vec![a.clone(), b], TargetFormat::Png, 2).unwrap();
        assert_eq!(art.byte_size(), 15);
        assert_eq!(art.file_path(), a.as_path());
        assert_eq!(art.files().len(), 2);
        assert_eq!(art.mime_type(), "image/png");
        assert_eq!(art.output_dir(), Some(dir.path()));
    }

    #[test]
    fn artifact_requires_files() {
        let err = Artifact::from_files(vec![], TargetFormat::Docx, 0).unwrap_err();
        assert!(matches!(err, ConvertError::Internal(_)));
    }

    #[test]
    fn artifact_missing_file_is_write_failure() {
        let err = Artifact::from_files(
            vec![PathBuf::from("/definitely/not/here.xlsx")],
            TargetFormat::Xlsx,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, ConvertError::WriteFailure { .. }));
    }

    #[test]
    fn artifact_serialises_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("doc.docx");
        std::fs::write(&f, b"PK").unwrap();
        let art = Artifact::from_files(vec![f], TargetFormat::Docx, 3).unwrap();
        let json = serde_json::to_string(&art).unwrap();
        assert!(json.contains("\"target\":\"docx\""));
        assert!(json.contains("wordprocessingml"));
        assert!(json.contains("\"rows_written\":0"));
    }
}
