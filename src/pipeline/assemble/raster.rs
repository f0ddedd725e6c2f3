//! Image target: one JPEG or PNG per page, named `page<N>.<ext>`.

use super::{write_file, Assembler, AssemblyContext, AssemblyOutput};
use crate::config::TargetFormat;
use crate::error::ConvertError;
use crate::pipeline::encode::{encode_page, ImageEncoding};
use tracing::{debug, info};

/// Renders every page and writes it as a standalone image file.
#[derive(Debug, Clone, Copy)]
pub struct ImageAssembler {
    target: TargetFormat,
}

impl ImageAssembler {
    /// `target` must be [`TargetFormat::Jpeg`] or [`TargetFormat::Png`];
    /// anything else encodes as PNG.
    pub fn new(target: TargetFormat) -> Self {
        Self { target }
    }

    fn encoding(&self, jpeg_quality: u8) -> ImageEncoding {
        match self.target {
            TargetFormat::Jpeg => ImageEncoding::Jpeg {
                quality: jpeg_quality,
            },
            _ => ImageEncoding::Png,
        }
    }
}

impl Assembler for ImageAssembler {
    fn target(&self) -> TargetFormat {
        self.target
    }

    fn assemble(&self, ctx: &mut AssemblyContext<'_>) -> Result<AssemblyOutput, ConvertError> {
        let session = ctx.engine.open_raster(ctx.document)?;
        let total = session.page_count();
        if total == 0 {
            return Err(ConvertError::EmptyDocument {
                path: ctx.document.path().to_path_buf(),
            });
        }
        ctx.progress.conversion_start(total);

        let encoding = self.encoding(ctx.config.jpeg_quality);
        let mut out = AssemblyOutput {
            page_count: total,
            ..Default::default()
        };

        for index in 0..total {
            ctx.cancel.check()?;

            let page = session.render(index, ctx.config.dpi)?;
            let bytes = encode_page(&page.image, encoding).map_err(|e| ConvertError::RenderFailure {
                page_index: index,
                detail: format!("encoding failed: {e}"),
            })?;
            drop(page);

            let path = ctx
                .output_dir
                .join(format!("page{}.{}", index + 1, encoding.extension()));
            write_file(&path, &bytes)?;
            debug!("Wrote {} ({} bytes)", path.display(), bytes.len());

            out.files.push(path);
            out.stats.images_written += 1;
            ctx.progress.page_complete(index + 1, total);
            ctx.progress.report_pages((index + 1) as f32, total);
        }

        info!("Wrote {} {} page image(s)", out.files.len(), self.target);
        Ok(out)
    }
}
