//! Flow-document target: a DOCX interleaving each page's text with an image
//! of the page.
//!
//! For every page, in order:
//!
//! 1. extract the page text; if anything is left after trimming, append it
//!    as one paragraph (source lines become soft line breaks)
//! 2. render the page and append it as an inline PNG picture, scaled to fit
//!    [`crate::ConversionConfig::flow_max_image_width_emu`]
//! 3. optionally append a page break
//!
//! Progress runs from `BASE` to `BASE + SPAN`, with a step after the text
//! and another after the image of every page. Serialising the package takes
//! the remaining tail up to `1.0`.

use super::{write_with, Assembler, AssemblyContext, AssemblyOutput};
use crate::config::TargetFormat;
use crate::error::ConvertError;
use crate::pipeline::encode::{encode_page, ImageEncoding};
use docx_rs::{BreakType, Docx, Paragraph, Pic, Run};
use std::fs::File;
use tracing::{debug, info};

/// Progress reported once both sessions are open.
const BASE: f32 = 0.1;
/// Share of progress spent in the page loop.
const SPAN: f32 = 0.8;

/// docx-rs places pictures at 96 px per inch.
const EMU_PER_PIXEL: u64 = 9525;

/// Writes `<base name>.docx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowAssembler;

impl Assembler for FlowAssembler {
    fn target(&self) -> TargetFormat {
        TargetFormat::Docx
    }

    fn assemble(&self, ctx: &mut AssemblyContext<'_>) -> Result<AssemblyOutput, ConvertError> {
        let raster = ctx.engine.open_raster(ctx.document)?;
        let text = ctx.engine.open_text(ctx.document)?;
        let total = raster.page_count();
        ctx.progress.conversion_start(total);
        ctx.progress.report(BASE);

        let mut out = AssemblyOutput {
            page_count: total,
            ..Default::default()
        };
        let mut paragraphs = Vec::with_capacity(total * 3);

        for index in 0..total {
            ctx.cancel.check()?;

            let page_text = text.extract_page(index)?;
            if let Some(p) = text_paragraph(&page_text) {
                paragraphs.push(p);
                out.stats.text_blocks += 1;
            }
            ctx.progress.report(step(index as f32 + 0.5, total));

            let page = raster.render(index, ctx.config.dpi)?;
            let png = encode_page(&page.image, ImageEncoding::Png).map_err(|e| {
                ConvertError::RenderFailure {
                    page_index: index,
                    detail: format!("encoding failed: {e}"),
                }
            })?;
            let (w_emu, h_emu) = picture_size_emu(
                page.pixel_width,
                page.pixel_height,
                ctx.config.flow_max_image_width_emu,
            );
            let pic = Pic::new_with_dimensions(png, page.pixel_width, page.pixel_height)
                .id(picture_id(index))
                .size(w_emu, h_emu);
            drop(page);
            paragraphs.push(Paragraph::new().add_run(Run::new().add_image(pic)));
            out.stats.images_written += 1;

            if ctx.config.flow_page_breaks && index + 1 < total {
                paragraphs.push(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
            }

            debug!("Page {}/{} added to document", index + 1, total);
            ctx.progress.page_complete(index + 1, total);
            ctx.progress.report(step((index + 1) as f32, total));
        }
        drop(text);
        drop(raster);

        let docx = paragraphs
            .into_iter()
            .enumerate()
            .fold(Docx::new(), |docx, (i, p)| {
                docx.add_paragraph(p.id(paragraph_id(i)))
            });

        let path = ctx.single_output_path(TargetFormat::Docx);
        write_with(&path, |tmp| {
            let file = File::create(tmp)?;
            docx.build().pack(file).map_err(std::io::Error::other)
        })?;
        ctx.progress.report(1.0);

        info!(
            "Wrote {} ({} text blocks, {} images)",
            path.display(),
            out.stats.text_blocks,
            out.stats.images_written
        );
        out.files.push(path);
        Ok(out)
    }
}

fn step(done: f32, total: usize) -> f32 {
    BASE + crate::progress::fraction(done, total) * SPAN
}

/// Relationship id of a page's picture. docx-rs would otherwise number
/// pictures from a process-wide counter.
fn picture_id(page_index: usize) -> String {
    format!("rIdImage{}", page_index + 1)
}

/// `w14:paraId` of the `n`th paragraph; must stay below `0x8000_0000`.
fn paragraph_id(n: usize) -> String {
    format!("{:08X}", n + 1)
}

/// One paragraph for a page's text, or `None` when it is blank.
fn text_paragraph(text: &str) -> Option<Paragraph> {
    if text.trim().is_empty() {
        return None;
    }
    let mut run = Run::new();
    for (i, line) in text.trim_end().lines().enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(xml_safe(line));
    }
    Some(Paragraph::new().add_run(run))
}

/// Drop characters XML 1.0 cannot carry. pdfium emits form feeds and NULs
/// for some layouts.
fn xml_safe(line: &str) -> String {
    line.chars()
        .filter(|&c| c == '\t' || !c.is_control())
        .collect()
}

/// Picture size in EMU: pixels at 96 px/in, scaled down to `max_width_emu`
/// with the aspect ratio kept. Saturates at `u32::MAX`, the widest extent
/// docx-rs can store.
fn picture_size_emu(width_px: u32, height_px: u32, max_width_emu: u32) -> (u32, u32) {
    let w = width_px as u64 * EMU_PER_PIXEL;
    let h = height_px as u64 * EMU_PER_PIXEL;
    let (w, h) = if w <= max_width_emu as u64 || w == 0 {
        (w, h)
    } else {
        let scaled_h = (h as f64 * max_width_emu as f64 / w as f64).round() as u64;
        (max_width_emu as u64, scaled_h.max(1))
    };
    (saturate(w), saturate(h))
}

fn saturate(emu: u64) -> u32 {
    u32::try_from(emu).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_scales_to_max_width() {
        // 1275x1650 px → 12_144_375 EMU wide, scaled to 6in keeping 17:22
        let (w, h) = picture_size_emu(1275, 1650, 5_486_400);
        assert_eq!(w, 5_486_400);
        assert_eq!(h, 7_100_047);
    }

    #[test]
    fn small_picture_keeps_native_size() {
        assert_eq!(picture_size_emu(100, 50, 5_486_400), (952_500, 476_250));
    }

    #[test]
    fn oversized_extent_saturates() {
        // 500_000 px wide is ~4.7e9 EMU, past what a u32 extent holds
        let (w, h) = picture_size_emu(500_000, 10, u32::MAX);
        assert_eq!(w, u32::MAX);
        assert_eq!(h, 95_250);
    }

    #[test]
    fn ids_depend_only_on_position() {
        assert_eq!(picture_id(0), "rIdImage1");
        assert_eq!(picture_id(2), "rIdImage3");
        assert_eq!(paragraph_id(0), "00000001");
        assert_eq!(paragraph_id(254), "000000FF");
    }

    #[test]
    fn blank_text_has_no_paragraph() {
        assert!(text_paragraph("").is_none());
        assert!(text_paragraph("  \n\t \n").is_none());
        assert!(text_paragraph("Hello\nworld").is_some());
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(xml_safe("a\u{c}b\0c\td"), "abc\td");
    }

    #[test]
    fn steps_span_base_to_ninety_percent() {
        assert!((step(0.0, 2) - 0.1).abs() < 1e-6);
        assert!((step(1.0, 2) - 0.5).abs() < 1e-6);
        assert!((step(2.0, 2) - 0.9).abs() < 1e-6);
        assert!((step(0.0, 0) - 0.9).abs() < 1e-6);
    }
}
