//! Image encoding: `DynamicImage` → JPEG or PNG bytes.
//!
//! JPEG has no alpha channel, so pages are flattened to RGB first. pdfium
//! renders onto an opaque white background, so nothing is lost. PNG keeps
//! the buffer as rendered.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Raster encodings supported by the image and flow targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Jpeg { quality: u8 },
    Png,
}

impl ImageEncoding {
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }
}

/// Encode a rendered page.
pub fn encode_page(img: &DynamicImage, encoding: ImageEncoding) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match encoding {
        ImageEncoding::Jpeg { quality } => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
        }
        ImageEncoding::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
    }
    debug!("Encoded {}x{} page → {} bytes {}", img.width(), img.height(), buf.len(), encoding.extension());
    Ok(buf)
}
