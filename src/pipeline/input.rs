//! Input validation: make sure the user-supplied path is a readable PDF.
//!
//! We check the `%PDF` magic bytes before handing the file to Ghostscript
//! or lopdf so callers get a meaningful error rather than a rasteriser
//! crash or an opaque xref parse failure.

use crate::error::PdfInvertError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
pub fn resolve_input(path: impl AsRef<Path>) -> Result<PathBuf, PdfInvertError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(PdfInvertError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(PdfInvertError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PdfInvertError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(PdfInvertError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
