//! PDF rasterisation: render selected pages to images.
//!
//! The rasteriser is a collaborator behind the [`Rasterizer`] trait so the
//! rest of the pipeline never shells out or touches pdfium directly, and
//! tests can inject a fake that returns synthetic bitmaps.
//!
//! Two backends ship with the crate:
//!
//! * [`GhostscriptRasterizer`] — runs `gs` with the `png16m` device, one
//!   `page_NNN.png` per selected page. This is the default.
//! * [`PdfiumRasterizer`] — renders in-process via `pdfium-render`; useful
//!   where Ghostscript is unavailable but a pdfium library is.
//!
//! Both leave their PNGs in the run's [`Workspace`] and return the decoded
//! images tagged with the source page number, in ascending page order.

use crate::config::{InvertConfig, RasterizerKind};
use crate::error::PdfInvertError;
use crate::pages::PageSet;
use crate::pipeline::workspace::Workspace;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// A rendered page, tagged with its 1-indexed page number in the source PDF.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub page: u32,
    pub image: DynamicImage,
}

/// Renders selected pages of a PDF.
pub trait Rasterizer {
    /// Short backend name for logs and error messages.
    fn name(&self) -> &str;

    /// Render every page in `pages` at `dpi`.
    ///
    /// Implementations must return exactly one image per selected page, in
    /// ascending page order, or fail.
    fn render(
        &self,
        document: &Path,
        pages: &PageSet,
        dpi: u32,
        workspace: &Workspace,
    ) -> Result<Vec<RasterImage>, PdfInvertError>;
}

/// Build the rasteriser selected in `config`.
pub fn rasterizer_for(config: &InvertConfig) -> Box<dyn Rasterizer> {
    match config.rasterizer {
        RasterizerKind::Ghostscript => Box::new(GhostscriptRasterizer::new(&config.gs_binary)),
        RasterizerKind::Pdfium => Box::new(PdfiumRasterizer),
    }
}

// ── Ghostscript ──────────────────────────────────────────────────────────

/// Rasterises through a Ghostscript subprocess.
#[derive(Debug, Clone)]
pub struct GhostscriptRasterizer {
    binary: String,
}

impl GhostscriptRasterizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The full argument list passed to Ghostscript.
    pub fn args(&self, document: &Path, pages: &PageSet, dpi: u32, workspace: &Workspace) -> Vec<String> {
        vec![
            "-dSAFER".to_string(),
            "-dBATCH".to_string(),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-sDEVICE=png16m".to_string(),
            format!("-r{dpi}"),
            format!("-sPageList={pages}"),
            format!("-sOutputFile={}", workspace.raster_pattern().display()),
            document.display().to_string(),
        ]
    }
}

impl Rasterizer for GhostscriptRasterizer {
    fn name(&self) -> &str {
        &self.binary
    }

    fn render(
        &self,
        document: &Path,
        pages: &PageSet,
        dpi: u32,
        workspace: &Workspace,
    ) -> Result<Vec<RasterImage>, PdfInvertError> {
        let args = self.args(document, pages, dpi, workspace);
        debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary).args(&args).output().map_err(|e| {
            PdfInvertError::ExternalToolMissing {
                tool: self.binary.clone(),
                source: e,
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(PdfInvertError::ExternalTool {
                tool: self.binary.clone(),
                status: output.status.to_string(),
                stderr: detail.trim().to_string(),
            });
        }

        let files = workspace.raster_files()?;
        if files.len() != pages.len() {
            return Err(PdfInvertError::RasterisationFailed {
                page: pages.iter().nth(files.len()).unwrap_or_else(|| pages.max()),
                detail: format!(
                    "{} produced {} images for {} selected pages",
                    self.binary,
                    files.len(),
                    pages.len()
                ),
            });
        }

        let mut results = Vec::with_capacity(files.len());
        for (page, path) in pages.iter().zip(files) {
            let image = image::open(&path).map_err(|e| PdfInvertError::Image {
                path: path.clone(),
                source: e,
            })?;
            debug!(
                "Rasterised page {} → {}x{} px ({})",
                page,
                image.width(),
                image.height(),
                path.display()
            );
            results.push(RasterImage { page, image });
        }

        info!("{} rendered {} pages at {} DPI", self.binary, results.len(), dpi);
        Ok(results)
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Rasterises in-process with pdfium.
///
/// Binds to `PDFIUM_LIB_PATH` when set, otherwise to a library in the
/// working directory, otherwise to the system library.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumRasterizer;

fn bind_pdfium() -> Result<Pdfium, PdfInvertError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| PdfInvertError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

impl Rasterizer for PdfiumRasterizer {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn render(
        &self,
        document: &Path,
        pages: &PageSet,
        dpi: u32,
        workspace: &Workspace,
    ) -> Result<Vec<RasterImage>, PdfInvertError> {
        let pdfium = bind_pdfium()?;

        let pdf = pdfium
            .load_pdf_from_file(document, None)
            .map_err(|e| PdfInvertError::CorruptPdf {
                path: document.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let pdf_pages = pdf.pages();
        let total_pages = pdf_pages.len() as usize;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut results = Vec::with_capacity(pages.len());
        for (seq, page_num) in pages.iter().enumerate() {
            if page_num as usize > total_pages {
                return Err(PdfInvertError::PageOutOfRange {
                    page: page_num,
                    total: total_pages,
                });
            }

            let page = pdf_pages
                .get((page_num - 1) as u16)
                .map_err(|e| PdfInvertError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfInvertError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            let path = workspace.raster_path(seq + 1);
            image.save(&path).map_err(|e| PdfInvertError::Image {
                path: path.clone(),
                source: e,
            })?;
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            results.push(RasterImage {
                page: page_num,
                image,
            });
        }

        info!("pdfium rendered {} pages at {} DPI", results.len(), dpi);
        Ok(results)
    }
}
