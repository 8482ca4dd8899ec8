//! Scoped scratch directory for one repair run.
//!
//! Raster PNGs, normalised PNGs and the replacement PDF all live here.
//! The directory is owned by a [`tempfile::TempDir`], so it is removed when
//! the [`Workspace`] is dropped: on success, on `?` early returns and on
//! panic unwinding alike. Only a hard kill of the process leaves it behind.

use crate::error::PdfInvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const RASTER_PREFIX: &str = "page_";
const NORMALIZED_PREFIX: &str = "inv_page_";

/// Private scratch directory with fixed file naming.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named, process-private directory.
    pub fn create() -> Result<Self, PdfInvertError> {
        let dir = tempfile::Builder::new()
            .prefix("pdfinvert-")
            .tempdir()
            .map_err(|e| PdfInvertError::io("Failed to create scratch directory", e))?;
        debug!("Workspace created at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// printf-style output pattern handed to Ghostscript (`page_%03d.png`).
    pub fn raster_pattern(&self) -> PathBuf {
        self.path().join(format!("{RASTER_PREFIX}%03d.png"))
    }

    /// Path of the `seq`-th rasterised page (1-based sequence, not page number).
    pub fn raster_path(&self, seq: usize) -> PathBuf {
        self.path().join(format!("{RASTER_PREFIX}{seq:03}.png"))
    }

    /// Path of the normalised rendition of the `seq`-th rasterised page.
    pub fn normalized_path(&self, seq: usize) -> PathBuf {
        self.path().join(format!("{NORMALIZED_PREFIX}{seq:03}.png"))
    }

    /// Path of the assembled replacement document.
    pub fn replacement_pdf(&self) -> PathBuf {
        self.path().join("inverted.pdf")
    }

    /// Raster PNGs currently in the workspace, in sequence order.
    ///
    /// Sorted on the numeric sequence rather than the file name so runs of
    /// more than 999 pages (`page_1000.png`) still come out in page order.
    pub fn raster_files(&self) -> Result<Vec<PathBuf>, PdfInvertError> {
        let entries = std::fs::read_dir(self.path())
            .map_err(|e| PdfInvertError::io("Failed to list scratch directory", e))?;

        let mut files: Vec<(u64, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PdfInvertError::io("Failed to list scratch directory", e))?;
            let path = entry.path();
            if let Some(seq) = raster_sequence(&path) {
                files.push((seq, path));
            }
        }
        files.sort_by_key(|(seq, _)| *seq);
        Ok(files.into_iter().map(|(_, p)| p).collect())
    }

    /// Remove the directory now, reporting any failure.
    ///
    /// Dropping the workspace also removes it but swallows errors.
    pub fn close(self) -> Result<(), PdfInvertError> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| PdfInvertError::io(format!("Failed to remove {}", path.display()), e))?;
        debug!("Workspace removed: {}", path.display());
        Ok(())
    }
}

/// `page_007.png` → `Some(7)`; anything else → `None`.
fn raster_sequence(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let digits = name.strip_prefix(RASTER_PREFIX)?.strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_scheme() {
        let ws = Workspace::create().unwrap();
        assert!(ws.raster_path(7).ends_with("page_007.png"));
        assert!(ws.normalized_path(7).ends_with("inv_page_007.png"));
        assert!(ws.raster_pattern().ends_with("page_%03d.png"));
        assert!(ws.replacement_pdf().ends_with("inverted.pdf"));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("pdfinvert-"));
    }

    #[test]
    fn raster_files_sorted_numerically() {
        let ws = Workspace::create().unwrap();
        for name in ["page_1000.png", "page_002.png", "page_101.png", "inv_page_001.png", "notes.txt"] {
            std::fs::write(ws.path().join(name), b"x").unwrap();
        }
        let names: Vec<String> = ws
            .raster_files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page_002.png", "page_101.png", "page_1000.png"]);
    }

    #[test]
    fn dropped_workspace_is_removed() {
        let ws = Workspace::create().unwrap();
        let path = ws.path().to_path_buf();
        std::fs::write(ws.raster_path(1), b"x").unwrap();
        assert!(path.exists());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn closed_workspace_is_removed() {
        let ws = Workspace::create().unwrap();
        let path = ws.path().to_path_buf();
        ws.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn workspace_removed_on_error_path() {
        fn failing_stage(ws: &Workspace) -> Result<(), PdfInvertError> {
            std::fs::write(ws.normalized_path(1), b"x")
                .map_err(|e| PdfInvertError::io("write", e))?;
            Err(PdfInvertError::EmptySelection)
        }
        fn run() -> (PathBuf, Result<(), PdfInvertError>) {
            let ws = Workspace::create().unwrap();
            let path = ws.path().to_path_buf();
            (path, failing_stage(&ws))
        }
        let (path, result) = run();
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
