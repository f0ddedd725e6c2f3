//! Page rasterisation: one page at a time, at a fixed DPI.
//!
//! A [`RasterSession`] is an open document seen through the rendering
//! capability. Sessions are boxed trait objects tied to the lifetime of the
//! engine that opened them; dropping the box closes the document, so every
//! exit path (including `?` and panics) releases the native handle.
//!
//! Each [`RasterPage`] owns its pixels and nothing else: no page handle
//! outlives [`RasterSession::render`], and callers drop the page as soon as
//! it is encoded, so peak memory is one page regardless of document length.

use crate::error::ConvertError;
use crate::pipeline::engine::PdfiumEngine;
use crate::pipeline::input::LocalDocument;
use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Size of one page in points, read from an open session on demand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// 0-based page index.
    pub index: usize,
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageDescriptor {
    /// Pixel size at `dpi`: `round(points * dpi / 72)`, at least 1 px.
    pub fn pixel_size(&self, dpi: u32) -> (u32, u32) {
        (
            points_to_pixels(self.width_pt, dpi),
            points_to_pixels(self.height_pt, dpi),
        )
    }
}

fn points_to_pixels(points: f32, dpi: u32) -> u32 {
    let px = (points as f64 * dpi as f64 / POINTS_PER_INCH).round();
    if px < 1.0 {
        1
    } else {
        px as u32
    }
}

/// One rendered page. Consumed by the assembler that writes it.
pub struct RasterPage {
    /// 0-based page index.
    pub index: usize,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub image: DynamicImage,
}

impl RasterPage {
    pub fn new(index: usize, image: DynamicImage) -> Self {
        Self {
            index,
            pixel_width: image.width(),
            pixel_height: image.height(),
            image,
        }
    }
}

/// Opens documents for rendering.
pub trait Rasterizer {
    fn open_raster<'a>(
        &'a self,
        document: &LocalDocument,
    ) -> Result<Box<dyn RasterSession + 'a>, ConvertError>;
}

/// An open document that can render pages.
pub trait RasterSession {
    /// Page count, fixed for the life of the session.
    fn page_count(&self) -> usize;

    /// Size of page `index` in points.
    fn page(&self, index: usize) -> Result<PageDescriptor, ConvertError>;

    /// Render page `index` at `dpi`. Failures are
    /// [`ConvertError::RenderFailure`] carrying `index`.
    fn render(&self, index: usize, dpi: u32) -> Result<RasterPage, ConvertError>;
}

// ── pdfium implementation ────────────────────────────────────────────────

pub(crate) struct PdfiumRasterSession<'a> {
    document: PdfDocument<'a>,
    path: PathBuf,
    page_count: usize,
}

impl Rasterizer for PdfiumEngine {
    fn open_raster<'a>(
        &'a self,
        document: &LocalDocument,
    ) -> Result<Box<dyn RasterSession + 'a>, ConvertError> {
        let pdf = self.load(document.path())?;
        let page_count = pdf.pages().len() as usize;
        info!("PDF loaded for rendering: {} pages", page_count);
        Ok(Box::new(PdfiumRasterSession {
            document: pdf,
            path: document.path().to_path_buf(),
            page_count,
        }))
    }
}

fn pdfium_page_index(index: usize) -> Result<u16, ConvertError> {
    u16::try_from(index).map_err(|_| ConvertError::RenderFailure {
        page_index: index,
        detail: "page index exceeds pdfium's u16 range".into(),
    })
}

impl RasterSession for PdfiumRasterSession<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, index: usize) -> Result<PageDescriptor, ConvertError> {
        let page = self
            .document
            .pages()
            .get(pdfium_page_index(index)?)
            .map_err(|e| ConvertError::RenderFailure {
                page_index: index,
                detail: format!("{:?}", e),
            })?;
        Ok(PageDescriptor {
            index,
            width_pt: page.width().value,
            height_pt: page.height().value,
        })
    }

    fn render(&self, index: usize, dpi: u32) -> Result<RasterPage, ConvertError> {
        let page = self
            .document
            .pages()
            .get(pdfium_page_index(index)?)
            .map_err(|e| ConvertError::RenderFailure {
                page_index: index,
                detail: format!("{:?}", e),
            })?;
        let descriptor = PageDescriptor {
            index,
            width_pt: page.width().value,
            height_pt: page.height().value,
        };
        let (width, height) = descriptor.pixel_size(dpi);

        let render_config = PdfRenderConfig::new().set_target_size(width as i32, height as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ConvertError::RenderFailure {
                page_index: index,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} of {} → {}x{} px",
            index + 1,
            self.path.display(),
            image.width(),
            image.height()
        );

        Ok(RasterPage::new(index, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn letter_page_at_150_dpi() {
        let p = PageDescriptor {
            index: 0,
            width_pt: 612.0,
            height_pt: 792.0,
        };
        assert_eq!(p.pixel_size(150), (1275, 1650));
        assert_eq!(p.pixel_size(72), (612, 792));
    }

    #[test]
    fn a4_page_rounds() {
        let p = PageDescriptor {
            index: 0,
            width_pt: 595.0,
            height_pt: 842.0,
        };
        // 595 * 150 / 72 = 1239.58…, 842 * 150 / 72 = 1754.16…
        assert_eq!(p.pixel_size(150), (1240, 1754));
    }

    #[test]
    fn tiny_page_is_at_least_one_pixel() {
        let p = PageDescriptor {
            index: 0,
            width_pt: 0.1,
            height_pt: 0.1,
        };
        assert_eq!(p.pixel_size(72), (1, 1));
    }

    #[test]
    fn raster_page_reads_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(7, 3, Rgba([0, 0, 0, 255])));
        let page = RasterPage::new(4, img);
        assert_eq!((page.index, page.pixel_width, page.pixel_height), (4, 7, 3));
    }
}
