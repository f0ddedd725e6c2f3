//! CLI binary for pdfconvert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, runs one job and prints the artifact.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdfconvert::{
    inspect, submit, ConversionConfig, ConversionJob, ConvertError, ProgressSink, SourceReference,
    TargetFormat,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress sink using indicatif ────────────────────────────────────────

/// Terminal progress sink: a percentage bar plus one log line per page.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(1000);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Copying source…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ProgressSink for CliProgress {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {percent:>3}%  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} page(s)…"))
        ));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}",
            green("✓"),
            page_num,
            total_pages
        ));
    }

    fn on_progress(&self, fraction: f32) {
        self.bar.set_position((fraction * 1000.0).round() as u64);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PNG per page at the default 150 DPI
  pdfconvert report.pdf --to png

  # High-resolution JPEGs into a chosen directory
  pdfconvert scan.pdf --to jpg --dpi 300 --output-dir ./out

  # Word document with page text and page images
  pdfconvert slides.pdf --to docx

  # Spreadsheet, one row per text line
  pdfconvert invoice.pdf --to xlsx --sheet-name Invoice

  # Convert from URL
  pdfconvert https://arxiv.org/pdf/1706.03762 --to docx

  # Inspect PDF metadata without converting
  pdfconvert --inspect-only document.pdf

  # JSON description of the artifact
  pdfconvert --json document.pdf --to png > artifact.json

TARGETS:
  jpg | jpeg   one JPEG per page           image/jpeg
  png          one PNG per page            image/png
  docx | word  text + page images          wordprocessingml.document
  xlsx | excel one row per text line       spreadsheetml.sheet

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override log filter (e.g. pdfconvert=debug)

Press Ctrl-C during a conversion to cancel it; partial output is removed.
"#;

/// Convert PDF files and URLs to images, DOCX or XLSX.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconvert",
    version,
    about = "Convert PDF files and URLs to page images, DOCX or XLSX",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Target format: jpg, png, docx or xlsx.
    #[arg(short = 't', long = "to", env = "PDFCONVERT_TO", default_value = "png",
          value_parser = parse_target)]
    target: TargetFormat,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDFCONVERT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// JPEG quality (1–100).
    #[arg(long, env = "PDFCONVERT_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Directory under which the job directory is created.
    #[arg(short, long, env = "PDFCONVERT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Directory for the temporary copy of the source.
    #[arg(long, env = "PDFCONVERT_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Name used for the output file (defaults to the input file name).
    #[arg(long)]
    name: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFCONVERT_PASSWORD")]
    password: Option<String>,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Worksheet name for the xlsx target.
    #[arg(long, default_value = "PDF")]
    sheet_name: String,

    /// Do not insert page breaks between pages in the docx target.
    #[arg(long)]
    no_page_breaks: bool,

    /// Output structured JSON (Artifact or metadata) instead of text.
    #[arg(long, env = "PDFCONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCONVERT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFCONVERT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

fn parse_target(s: &str) -> Result<TargetFormat, ConvertError> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let mut source = SourceReference::parse(&cli.input);
    if let Some(ref name) = cli.name {
        source = source.with_display_name(name);
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&source, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(first) = meta.pages.first() {
                let (w, h) = first.pixel_size(cli.dpi);
                println!(
                    "Page 1:       {:.0} × {:.0} pt ({} × {} px at {} DPI)",
                    first.width_pt, first.height_pt, w, h, cli.dpi
                );
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let progress = show_progress.then(CliProgress::new);
    let mut job = ConversionJob::new(source, cli.target);
    if let Some(ref p) = progress {
        job = job.with_progress_callback(Arc::clone(p) as Arc<dyn ProgressSink>);
    }

    let handle = submit(job, &config);
    let cancel = handle.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = handle.join().await;
    if let Some(ref p) = progress {
        p.bar.finish_and_clear();
    }

    let artifact = match result {
        Ok(a) => a,
        Err(e) if e.is_cancelled() => {
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), bold("Cancelled; partial output removed"));
            }
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("Conversion failed"),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialise artifact")?
        );
        return Ok(());
    }

    for f in artifact.files() {
        println!("{}", f.display());
    }

    if !cli.quiet {
        let stats = artifact.stats();
        eprintln!(
            "{}  {} page(s)  {} file(s)  {} bytes  {}ms  →  {}",
            green("✔"),
            artifact.page_count(),
            artifact.files().len(),
            artifact.byte_size(),
            stats.duration_ms,
            bold(
                &artifact
                    .output_dir()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default()
            ),
        );
        match artifact.target() {
            TargetFormat::Docx => eprintln!(
                "   {} text block(s)  /  {} image(s)",
                dim(&stats.text_blocks.to_string()),
                dim(&stats.images_written.to_string()),
            ),
            TargetFormat::Xlsx => {
                eprintln!("   {} row(s)", dim(&stats.rows_written.to_string()))
            }
            TargetFormat::Jpeg | TargetFormat::Png => {}
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .jpeg_quality(cli.quality)
        .sheet_name(cli.sheet_name.clone())
        .flow_page_breaks(!cli.no_page_breaks)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_root(dir);
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref dir) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(dir);
    }

    builder.build().context("Invalid configuration")
}
