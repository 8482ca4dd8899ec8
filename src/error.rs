//! Error types for the edgequake-pdfinvert library.
//!
//! Every failure in the pipeline is fatal: there is no per-page tolerance
//! because a half-repaired document is worse than none. The only
//! compensating action on error is removal of the scratch workspace, which
//! happens when [`crate::pipeline::workspace::Workspace`] is dropped.
//!
//! The variants fall into four families:
//!
//! * **Parse** — [`PdfInvertError::InvalidPageRange`], raised before any
//!   external tool runs.
//! * **External tool** — the rasteriser failed to start or exited non-zero.
//! * **I/O** — reading the input, writing images, writing the output.
//! * **Structural mismatch** — the page selection does not fit the document
//!   or the replacement document does not line up with the selection. See
//!   [`PdfInvertError::is_structural`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdfinvert library.
#[derive(Debug, Error)]
pub enum PdfInvertError {
    // ── Parse errors ──────────────────────────────────────────────────────
    /// The page-range expression could not be parsed.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(#[from] PageRangeError),

    /// A run was requested with no pages to convert.
    #[error("No pages selected for conversion")]
    EmptySelection,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF is encrypted; pages cannot be rewritten without decrypting it.
    #[error("PDF '{path}' is encrypted.\nDecrypt it first, e.g. qpdf --decrypt input.pdf output.pdf")]
    EncryptedPdf { path: PathBuf },

    // ── Rasteriser errors ─────────────────────────────────────────────────
    /// The external rasteriser binary could not be started.
    #[error("Failed to run '{tool}': {source}\nIs it installed and on PATH?")]
    ExternalToolMissing {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The external rasteriser exited with a non-zero status.
    #[error("'{tool}' exited with {status}: {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or use --rasterizer gs."
    )]
    PdfiumBindingFailed(String),

    /// A selected page could not be rasterised.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: u32, detail: String },

    // ── Structural mismatch ───────────────────────────────────────────────
    /// A selected page number exceeds the document's page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: usize },

    /// The replacement document does not hold one page per selected page.
    #[error("Replacement document has {actual} pages but {expected} pages were selected")]
    ReplacementCountMismatch { expected: usize, actual: usize },

    /// The merge cursor did not exhaust the replacement pages exactly.
    #[error("Merge consumed {consumed} of {expected} replacement pages")]
    CursorMismatch { consumed: usize, expected: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Generic I/O failure with a short description of what was attempted.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Image decoding or encoding failed.
    #[error("Image error for '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// lopdf failed while building or serialising a document.
    #[error("PDF processing failed: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PdfInvertError {
    /// True for errors where the page selection and the documents disagree.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PdfInvertError::PageOutOfRange { .. }
                | PdfInvertError::ReplacementCountMismatch { .. }
                | PdfInvertError::CursorMismatch { .. }
        )
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PdfInvertError::Io {
            context: context.into(),
            source,
        }
    }
}

/// A malformed page-range expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageRangeError {
    /// Expression was empty or whitespace only.
    #[error("expression is empty")]
    Empty,

    /// Two commas with nothing between them, or a trailing comma.
    #[error("empty entry at position {position} in '{expr}'")]
    EmptyToken { expr: String, position: usize },

    /// Token is neither an integer nor `a-b`.
    #[error("'{token}' is not a page number or an a-b range")]
    Malformed { token: String },

    /// Pages are 1-indexed.
    #[error("pages are 1-indexed, got 0 in '{token}'")]
    ZeroPage { token: String },

    /// Range end is below its start.
    #[error("range '{token}' ends before it starts")]
    Reversed { token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = PdfInvertError::PageOutOfRange { page: 21, total: 20 };
        let msg = e.to_string();
        assert!(msg.contains("21"), "got: {msg}");
        assert!(msg.contains("20 pages"), "got: {msg}");
    }

    #[test]
    fn structural_family() {
        assert!(PdfInvertError::PageOutOfRange { page: 3, total: 2 }.is_structural());
        assert!(PdfInvertError::ReplacementCountMismatch {
            expected: 4,
            actual: 3
        }
        .is_structural());
        assert!(PdfInvertError::CursorMismatch {
            consumed: 1,
            expected: 2
        }
        .is_structural());
        assert!(!PdfInvertError::EmptySelection.is_structural());
    }

    #[test]
    fn page_range_error_converts() {
        let e: PdfInvertError = PageRangeError::Malformed {
            token: "a-b".into(),
        }
        .into();
        assert!(matches!(e, PdfInvertError::InvalidPageRange(_)));
        assert!(e.to_string().contains("a-b"));
    }

    #[test]
    fn external_tool_display() {
        let e = PdfInvertError::ExternalTool {
            tool: "gs".into(),
            status: "exit status: 1".into(),
            stderr: "Unrecoverable error".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gs"));
        assert!(msg.contains("Unrecoverable error"));
    }
}
