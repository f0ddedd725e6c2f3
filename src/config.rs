//! Configuration types for PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! config can be cloned into the blocking render task and logged as a whole.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// EMU (English Metric Units) per inch, the DOCX drawing unit.
pub const EMU_PER_INCH: u32 = 914_400;

/// Configuration for a conversion job.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfconvert::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .jpeg_quality(85)
///     .output_root("/tmp/conversions")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 150.
    ///
    /// Pixel size is `round(points * dpi / 72)`, so a US-Letter page at 150 DPI
    /// renders to 1275 × 1650 px.
    pub dpi: u32,

    /// JPEG quality for the `jpg` target. Range: 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// Directory under which every job creates its own `job-*` output directory.
    /// Default: `<system temp>/pdfconvert`.
    pub output_root: PathBuf,

    /// Directory for the private copy of the source. Default: system temp.
    pub scratch_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory containing the pdfium shared library. When `None` the
    /// current directory is tried first, then the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Maximum width of an embedded page image in the DOCX target, in EMU.
    /// Default: 6 inches, the text width of a Letter page with 1.25" margins.
    pub flow_max_image_width_emu: u32,

    /// Insert a page break after each source page in the DOCX target. Default: true.
    pub flow_page_breaks: bool,

    /// Worksheet name for the XLSX target. Default: "PDF".
    pub sheet_name: String,

    /// Download timeout for URL sources in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            jpeg_quality: 90,
            output_root: std::env::temp_dir().join("pdfconvert"),
            scratch_dir: None,
            password: None,
            pdfium_lib_path: None,
            flow_max_image_width_emu: 6 * EMU_PER_INCH,
            flow_page_breaks: true,
            sheet_name: "PDF".to_string(),
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("output_root", &self.output_root)
            .field("scratch_dir", &self.scratch_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("flow_max_image_width_emu", &self.flow_max_image_width_emu)
            .field("flow_page_breaks", &self.flow_page_breaks)
            .field("sheet_name", &self.sheet_name)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    pub fn flow_max_image_width_emu(mut self, emu: u32) -> Self {
        self.config.flow_max_image_width_emu = emu;
        self
    }

    pub fn flow_page_breaks(mut self, v: bool) -> Self {
        self.config.flow_page_breaks = v;
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = name.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ConvertError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.flow_max_image_width_emu == 0 {
            return Err(ConvertError::InvalidConfig(
                "flow_max_image_width_emu must be > 0".into(),
            ));
        }
        // Excel rejects empty names, names over 31 chars and a few specials.
        let name = c.sheet_name.as_str();
        if name.is_empty()
            || name.chars().count() > 31
            || name.contains(['[', ']', ':', '*', '?', '/', '\\'])
        {
            return Err(ConvertError::InvalidConfig(format!(
                "Invalid worksheet name '{name}'"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// The artifact format a job produces.
///
/// | Target | Pipeline stages | MIME type |
/// |--------|-----------------|-----------|
/// | `Jpeg`, `Png` | render | `image/jpeg`, `image/png` |
/// | `Docx` | extract per page + render | wordprocessingml |
/// | `Xlsx` | extract whole document | spreadsheetml |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// One JPEG per page.
    Jpeg,
    /// One PNG per page.
    Png,
    /// A DOCX package interleaving page text and page images.
    Docx,
    /// An XLSX workbook with one row per extracted text line.
    Xlsx,
}

impl TargetFormat {
    /// All targets, in the order they are offered to users.
    pub const ALL: [TargetFormat; 4] = [
        TargetFormat::Jpeg,
        TargetFormat::Png,
        TargetFormat::Docx,
        TargetFormat::Xlsx,
    ];

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Docx => "docx",
            TargetFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Png => "image/png",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            TargetFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    /// `true` for the per-page raster targets.
    pub fn is_raster(self) -> bool {
        matches!(self, TargetFormat::Jpeg | TargetFormat::Png)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(TargetFormat::Jpeg),
            "png" => Ok(TargetFormat::Png),
            "docx" | "word" => Ok(TargetFormat::Docx),
            "xlsx" | "excel" => Ok(TargetFormat::Xlsx),
            _ => Err(ConvertError::UnsupportedTarget {
                target: s.to_string(),
            }),
        }
    }
}
