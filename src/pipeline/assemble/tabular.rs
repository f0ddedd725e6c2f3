//! Tabular target: an XLSX workbook with one row per extracted text line.
//!
//! The whole document is extracted in one pass and split on line endings;
//! line `i` lands in cell `A{i+1}` of a single worksheet. No table structure
//! is inferred.

use super::{write_with, Assembler, AssemblyContext, AssemblyOutput};
use crate::config::TargetFormat;
use crate::error::ConvertError;
use crate::pipeline::text::split_lines;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook};
use tracing::{info, warn};

/// Rows per worksheet in the XLSX format.
pub const MAX_ROWS: usize = 1_048_576;
/// Characters per cell in the XLSX format.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Creation time stamped into `docProps/core.xml`; the zip entry epoch.
const PACKAGE_EPOCH: (u16, u8, u8) = (1980, 1, 1);

/// Writes `<base name>.xlsx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularAssembler;

impl Assembler for TabularAssembler {
    fn target(&self) -> TargetFormat {
        TargetFormat::Xlsx
    }

    fn assemble(&self, ctx: &mut AssemblyContext<'_>) -> Result<AssemblyOutput, ConvertError> {
        let session = ctx.engine.open_text(ctx.document)?;
        let total = session.page_count();
        ctx.progress.conversion_start(total);

        ctx.cancel.check()?;
        let text = session.extract_all()?;
        drop(session);
        ctx.progress.report(0.5);

        let lines = split_lines(&text);
        let path = ctx.single_output_path(TargetFormat::Xlsx);
        if lines.len() > MAX_ROWS {
            return Err(ConvertError::write_failure_msg(
                &path,
                format!(
                    "{} lines exceed the worksheet limit of {} rows",
                    lines.len(),
                    MAX_ROWS
                ),
            ));
        }

        let mut workbook = Workbook::new();
        let (y, m, d) = PACKAGE_EPOCH;
        let created =
            ExcelDateTime::from_ymd(y, m, d).map_err(|e| ConvertError::write_failure_msg(&path, e))?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&ctx.config.sheet_name)
            .map_err(|e| ConvertError::write_failure_msg(&path, e))?;

        for (row, line) in lines.iter().enumerate() {
            let cell = truncate_cell(line, row);
            sheet
                .write_string(row as u32, 0, cell)
                .map_err(|e| ConvertError::write_failure_msg(&path, e))?;
        }

        write_with(&path, |tmp| workbook.save(tmp).map_err(std::io::Error::other))?;
        ctx.progress.report(1.0);

        info!("Wrote {} ({} rows)", path.display(), lines.len());
        Ok(AssemblyOutput {
            files: vec![path],
            page_count: total,
            stats: crate::output::ConversionStats {
                rows_written: lines.len(),
                ..Default::default()
            },
        })
    }
}

fn truncate_cell(line: &str, row: usize) -> &str {
    match line.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                "Row {} truncated to {} characters",
                row + 1,
                MAX_CELL_CHARS
            );
            &line[..cut]
        }
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_lines_are_untouched() {
        assert_eq!(truncate_cell("hello", 0), "hello");
    }

    #[test]
    fn long_lines_are_cut_on_a_char_boundary() {
        let line = "é".repeat(MAX_CELL_CHARS + 10);
        let cut = truncate_cell(&line, 3);
        assert_eq!(cut.chars().count(), MAX_CELL_CHARS);
    }
}
