//! Pipeline stages for PDF conversion.
//!
//! Each submodule implements one step. The engine-facing stages
//! ([`render`], [`text`]) are traits with a pdfium implementation, so the
//! assemblers can be driven by any engine, including the in-memory fakes
//! used in tests.
//!
//! ## Data Flow
//!
//! ```text
//!                       ┌─▶ render ──▶ encode ─┐
//! input ──▶ engine ─────┤                      ├──▶ assemble ──▶ files
//! (copy)    (pdfium)    └─▶ text ──────────────┘   (jpg/png/docx/xlsx)
//! ```
//!
//! 1. [`input`]: copy the source into a private temporary file
//! 2. [`engine`]: bind pdfium and open the copy; created on the blocking
//!    thread that uses it
//! 3. [`render`]: rasterise one page at a time
//! 4. [`text`]: extract plain text per page or for the whole document
//! 5. [`encode`]: JPEG/PNG-encode a rendered page
//! 6. [`assemble`]: write the target format into the job directory

pub mod assemble;
pub mod encode;
pub mod engine;
pub mod input;
pub mod render;
pub mod text;
