//! Format assemblers: one per target format.
//!
//! An [`Assembler`] drives the engine sessions it needs for its target,
//! writes its files into the job's output directory and returns what it
//! wrote. Every assembler follows the same stages:
//!
//! ```text
//! Opened → (per page: render | extract)* → Finalized → Written
//! ```
//!
//! Sessions are opened inside [`Assembler::assemble`] and dropped before it
//! returns, on success and on every error path.

mod flow;
mod raster;
mod tabular;

pub use flow::FlowAssembler;
pub use raster::ImageAssembler;
pub use tabular::TabularAssembler;

use crate::config::{ConversionConfig, TargetFormat};
use crate::error::ConvertError;
use crate::job::CancellationFlag;
use crate::output::ConversionStats;
use crate::pipeline::engine::DocumentEngine;
use crate::pipeline::input::LocalDocument;
use crate::progress::ProgressReporter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Everything an assembler may touch during one job.
pub struct AssemblyContext<'a> {
    pub document: &'a LocalDocument,
    pub engine: &'a dyn DocumentEngine,
    pub config: &'a ConversionConfig,
    /// Job-scoped directory; already exists.
    pub output_dir: &'a Path,
    pub progress: &'a mut ProgressReporter,
    pub cancel: &'a CancellationFlag,
}

impl AssemblyContext<'_> {
    /// `<output_dir>/<source base name>.<ext>`
    pub fn single_output_path(&self, target: TargetFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.document.base_name(), target.extension()))
    }
}

/// Files written by an assembler, in order.
#[derive(Debug, Default)]
pub struct AssemblyOutput {
    pub files: Vec<PathBuf>,
    pub page_count: usize,
    pub stats: ConversionStats,
}

/// Produces one target format from an open document.
pub trait Assembler: Send + Sync {
    fn target(&self) -> TargetFormat;

    fn assemble(&self, ctx: &mut AssemblyContext<'_>) -> Result<AssemblyOutput, ConvertError>;
}

/// The assembler for `target`.
pub fn assembler_for(target: TargetFormat) -> Box<dyn Assembler> {
    match target {
        TargetFormat::Jpeg | TargetFormat::Png => Box::new(ImageAssembler::new(target)),
        TargetFormat::Docx => Box::new(FlowAssembler),
        TargetFormat::Xlsx => Box::new(TabularAssembler),
    }
}

/// Write `bytes` to `path` through a sibling `.tmp` file, so a failed write
/// never leaves a truncated file under the final name.
pub(crate) fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    write_with(path, |tmp| {
        let mut f = fs::File::create(tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    })
}

/// Run `write` against a sibling `.tmp` path, then rename it into place.
pub(crate) fn write_with<F>(path: &Path, write: F) -> Result<(), ConvertError>
where
    F: FnOnce(&Path) -> std::io::Result<()>,
{
    let tmp = tmp_path(path);
    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(ConvertError::write_failure(path, e));
    }
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        ConvertError::write_failure(path, e)
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_every_target() {
        for t in TargetFormat::ALL {
            assert_eq!(assembler_for(t).target(), t);
        }
    }

    #[test]
    fn write_file_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("page1.png");
        write_file(&out, b"abc").unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"abc");
        assert!(!dir.path().join("page1.png.tmp").exists());
    }

    #[test]
    fn failed_write_is_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-subdir").join("x.docx");
        let err = write_file(&out, b"abc").unwrap_err();
        assert!(matches!(err, ConvertError::WriteFailure { .. }));
    }

    #[test]
    fn failing_writer_removes_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book.xlsx");
        let err = write_with(&out, |tmp| {
            fs::write(tmp, b"partial")?;
            Err(std::io::Error::other("boom"))
        })
        .unwrap_err();
        assert!(matches!(err, ConvertError::WriteFailure { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
