//! Source loading: copy a caller-supplied source into a private local file.
//!
//! ## Why copy first?
//!
//! pdfium needs a seekable file path, and the caller's source may not stay
//! readable for the whole job (a revoked content URI, a socket, a download).
//! Copying the full stream into a job-scoped [`NamedTempFile`] before any
//! parsing gives the engine a stable path and guarantees cleanup when the
//! [`LocalDocument`] is dropped, on success, error, cancellation or panic.
//!
//! The stream is opened and its first chunk read *before* the temp file is
//! created, so a source that fails immediately leaves nothing behind.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default display name when the source offers none.
pub const DEFAULT_DISPLAY_NAME: &str = "document.pdf";

const COPY_CHUNK: usize = 64 * 1024;
/// pdfium accepts up to 1 KiB of junk before the `%PDF` header.
const HEADER_WINDOW: usize = 1024;

/// A capability to open the source byte stream.
///
/// Implement this for sources the built-in variants don't cover (an
/// Android-style content URI, an object-store handle, ...). `open` may be
/// called from a blocking worker thread.
pub trait SourceOpener: Send + Sync {
    fn open(&self) -> std::io::Result<Box<dyn Read + Send>>;
}

#[derive(Clone)]
enum SourceKind {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
    Url(String),
    Opener(Arc<dyn SourceOpener>),
}

/// An opaque locator for the input document plus an optional display name.
///
/// The pipeline only borrows it; the same reference can be converted any
/// number of times.
#[derive(Clone)]
pub struct SourceReference {
    kind: SourceKind,
    display_name: Option<String>,
}

impl fmt::Debug for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            SourceKind::Path(p) => format!("Path({})", p.display()),
            SourceKind::Bytes(b) => format!("Bytes({} bytes)", b.len()),
            SourceKind::Url(u) => format!("Url({u})"),
            SourceKind::Opener(_) => "Opener(<dyn SourceOpener>)".to_string(),
        };
        f.debug_struct("SourceReference")
            .field("kind", &kind)
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl SourceReference {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: SourceKind::Path(path.into()),
            display_name: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            kind: SourceKind::Bytes(bytes.into()),
            display_name: None,
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Url(url.into()),
            display_name: None,
        }
    }

    pub fn from_opener(opener: Arc<dyn SourceOpener>) -> Self {
        Self {
            kind: SourceKind::Opener(opener),
            display_name: None,
        }
    }

    /// Interpret a user-supplied string: HTTP(S) URLs are downloaded,
    /// anything else is a local path.
    pub fn parse(input: &str) -> Self {
        if is_url(input) {
            Self::from_url(input)
        } else {
            Self::from_path(input)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The name shown to users: explicit name, else the file name of the
    /// path or URL, else [`DEFAULT_DISPLAY_NAME`].
    pub fn display_name(&self) -> String {
        if let Some(ref n) = self.display_name {
            if !n.trim().is_empty() {
                return n.clone();
            }
        }
        let derived = match &self.kind {
            SourceKind::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            SourceKind::Url(u) => url_file_name(u),
            SourceKind::Bytes(_) | SourceKind::Opener(_) => None,
        };
        derived.unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
    }

    /// The display name without its extension, safe to use as a file stem.
    pub fn base_name(&self) -> String {
        sanitize_base_name(&self.display_name())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

static RE_UNSAFE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._\- ]+").expect("static regex"));

/// Strip the extension and replace characters that are unsafe in file names.
pub fn sanitize_base_name(display_name: &str) -> String {
    let stem = Path::new(display_name.trim())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = RE_UNSAFE_NAME.replace_all(&stem, "_");
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// The pipeline-owned local copy of the source.
///
/// Dropping it deletes the temporary file.
#[derive(Debug)]
pub struct LocalDocument {
    file: NamedTempFile,
    byte_len: u64,
    display_name: String,
    base_name: String,
}

impl LocalDocument {
    /// Path of the private copy, valid until this value is dropped.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// File stem used for single-file artifacts.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

impl Drop for LocalDocument {
    fn drop(&mut self) {
        debug!("Releasing local copy {}", self.file.path().display());
    }
}

/// Copy the source into a job-scoped temporary file.
pub async fn load_source(
    source: &SourceReference,
    config: &ConversionConfig,
) -> Result<LocalDocument, ConvertError> {
    let display_name = source.display_name();
    let base_name = source.base_name();
    let scratch = config
        .scratch_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    let reader: Box<dyn Read + Send> = match &source.kind {
        SourceKind::Url(url) => {
            let bytes = download_url(url, config.download_timeout_secs).await?;
            Box::new(std::io::Cursor::new(bytes))
        }
        SourceKind::Bytes(b) => Box::new(std::io::Cursor::new(Arc::clone(b))),
        SourceKind::Path(p) => {
            let f = std::fs::File::open(p).map_err(|e| unreadable(&display_name, e))?;
            Box::new(f)
        }
        SourceKind::Opener(o) => {
            let opener = Arc::clone(o);
            let name = display_name.clone();
            tokio::task::spawn_blocking(move || opener.open())
                .await
                .map_err(|e| ConvertError::Internal(format!("Source open task panicked: {e}")))?
                .map_err(|e| unreadable(&name, e))?
        }
    };

    let name = display_name.clone();
    let (file, byte_len) =
        tokio::task::spawn_blocking(move || copy_to_scratch(reader, &scratch, &name))
            .await
            .map_err(|e| ConvertError::Internal(format!("Source copy task panicked: {e}")))??;

    info!(
        "Loaded source '{}' ({} bytes) → {}",
        display_name,
        byte_len,
        file.path().display()
    );

    Ok(LocalDocument {
        file,
        byte_len,
        display_name,
        base_name,
    })
}

fn unreadable(name: &str, e: impl fmt::Display) -> ConvertError {
    ConvertError::SourceUnreadable {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

/// One `read`, retrying on `Interrupted`.
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Fill `buf` up to `HEADER_WINDOW` bytes or EOF, however short the reads.
fn read_header(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let want = buf.len().min(HEADER_WINDOW);
    let mut filled = 0;
    while filled < want {
        let n = read_chunk(reader, &mut buf[filled..want])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn copy_to_scratch(
    mut reader: Box<dyn Read + Send>,
    scratch: &Path,
    name: &str,
) -> Result<(NamedTempFile, u64), ConvertError> {
    let mut buf = vec![0u8; COPY_CHUNK];

    // First read happens before anything touches the disk.
    let first = read_header(&mut reader, &mut buf).map_err(|e| unreadable(name, e))?;
    if first == 0 {
        return Err(ConvertError::CorruptDocument {
            path: PathBuf::from(name),
            detail: "source is empty".into(),
        });
    }
    let window = &buf[..first];
    if !window.windows(4).any(|w| w == b"%PDF") {
        let mut magic = [0u8; 4];
        let n = first.min(4);
        magic[..n].copy_from_slice(&buf[..n]);
        return Err(ConvertError::CorruptDocument {
            path: PathBuf::from(name),
            detail: format!("missing %PDF header, first bytes: {magic:?}"),
        });
    }

    std::fs::create_dir_all(scratch).map_err(|e| ConvertError::write_failure(scratch, e))?;
    let mut file = tempfile::Builder::new()
        .prefix("pdfconvert-src-")
        .suffix(".pdf")
        .tempfile_in(scratch)
        .map_err(|e| ConvertError::write_failure(scratch, e))?;

    let mut total = first as u64;
    file.write_all(&buf[..first])
        .map_err(|e| ConvertError::write_failure(file.path(), e))?;

    loop {
        let n = read_chunk(&mut reader, &mut buf).map_err(|e| unreadable(name, e))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| ConvertError::write_failure(file.path(), e))?;
        total += n as u64;
    }
    file.flush()
        .map_err(|e| ConvertError::write_failure(file.path(), e))?;

    debug!("Copied {} bytes to {}", total, file.path().display());
    Ok((file, total))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ConvertError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| unreadable(url, e))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            unreadable(url, format!("download timed out after {timeout_secs}s"))
        } else {
            unreadable(url, e)
        }
    })?;

    if !response.status().is_success() {
        return Err(unreadable(url, format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| unreadable(url, e))?;
    Ok(bytes.to_vec())
}
