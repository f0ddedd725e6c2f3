//! The document engine: one object that can both rasterise and extract text.
//!
//! ## Why a factory?
//!
//! pdfium is a blocking C++ library with process-global state, and its
//! document handles are not `Send`. The orchestrator therefore never moves an
//! engine between threads: it moves an [`EngineFactory`] (cheap, `Send +
//! Sync`) into `spawn_blocking` and creates the engine on the worker thread
//! that will use it. Every session the engine opens is dropped on that same
//! thread before the task returns.
//!
//! Tests substitute their own factory and engine to drive the pipeline
//! without a pdfium binary.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::DocumentMetadata;
use crate::pipeline::input::LocalDocument;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::text::TextExtractor;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rendering plus text extraction over the same document format.
pub trait DocumentEngine: Rasterizer + TextExtractor {
    /// Document metadata. The default reads page sizes through a raster
    /// session and leaves the info-dictionary fields empty.
    fn metadata(&self, document: &LocalDocument) -> Result<DocumentMetadata, ConvertError> {
        let session = self.open_raster(document)?;
        let page_count = session.page_count();
        let pages = (0..page_count)
            .map(|i| session.page(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DocumentMetadata {
            page_count,
            pages,
            ..Default::default()
        })
    }
}

/// Creates a [`DocumentEngine`] on the thread that will use it.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn DocumentEngine>, ConvertError>;
}

/// pdfium-backed engine.
pub struct PdfiumEngine {
    pdfium: Pdfium,
    password: Option<String>,
}

impl PdfiumEngine {
    /// Bind to pdfium: `lib_dir` if given, else the current directory, else
    /// the system library path.
    pub fn bind(lib_dir: Option<&Path>, password: Option<String>) -> Result<Self, ConvertError> {
        let bindings = match lib_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConvertError::EngineUnavailable(format!("{:?}", e)))?;

        debug!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password,
        })
    }

    /// Open `path`, mapping pdfium's errors onto the conversion taxonomy.
    pub(crate) fn load(&self, path: &Path) -> Result<PdfDocument<'_>, ConvertError> {
        let password = self.password.as_deref();
        self.pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ConvertError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    ConvertError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                ConvertError::CorruptDocument {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })
    }
}

impl DocumentEngine for PdfiumEngine {
    fn metadata(&self, document: &LocalDocument) -> Result<DocumentMetadata, ConvertError> {
        let pdf = self.load(document.path())?;
        let info = pdf.metadata();
        let pages = pdf.pages();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            info.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        let mut sizes = Vec::with_capacity(pages.len() as usize);
        for (index, page) in pages.iter().enumerate() {
            sizes.push(crate::pipeline::render::PageDescriptor {
                index,
                width_pt: page.width().value,
                height_pt: page.height().value,
            });
        }

        Ok(DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: pages.len() as usize,
            pdf_version: format!("{:?}", pdf.version()),
            pages: sizes,
        })
    }
}

/// Binds a fresh [`PdfiumEngine`] per job.
#[derive(Clone, Default)]
pub struct PdfiumFactory {
    lib_dir: Option<PathBuf>,
    password: Option<String>,
}

impl std::fmt::Debug for PdfiumFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumFactory")
            .field("lib_dir", &self.lib_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PdfiumFactory {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            lib_dir: config.pdfium_lib_path.clone(),
            password: config.password.clone(),
        }
    }
}

impl EngineFactory for PdfiumFactory {
    fn create(&self) -> Result<Box<dyn DocumentEngine>, ConvertError> {
        let engine = PdfiumEngine::bind(self.lib_dir.as_deref(), self.password.clone())?;
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_copies_engine_settings() {
        let cfg = ConversionConfig::builder()
            .password("pw")
            .pdfium_lib_path("/opt/pdfium/lib")
            .build()
            .unwrap();
        let f = PdfiumFactory::from_config(&cfg);
        assert_eq!(f.password.as_deref(), Some("pw"));
        assert_eq!(f.lib_dir.as_deref(), Some(Path::new("/opt/pdfium/lib")));
        assert!(!format!("{f:?}").contains("pw\""));
    }

    #[test]
    fn binding_to_missing_library_is_engine_unavailable() {
        let err = PdfiumEngine::bind(Some(Path::new("/definitely/not/a/pdfium/dir")), None)
            .err()
            .expect("bind must fail");
        assert!(matches!(err, ConvertError::EngineUnavailable(_)));
    }
}
