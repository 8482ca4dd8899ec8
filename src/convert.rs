//! Top-level repair entry points.
//!
//! [`invert_pages`] runs the whole pipeline: validate the input, rasterise
//! the selected pages, normalise each image, assemble the replacement
//! document and splice it into the source. Everything in between lives in
//! a private [`Workspace`] that is removed on success and on every error
//! path.

use crate::config::InvertConfig;
use crate::error::PdfInvertError;
use crate::output::{DocumentInfo, InvertStats};
use crate::pages::PageSet;
use crate::pipeline::render::{self, Rasterizer};
use crate::pipeline::workspace::Workspace;
use crate::pipeline::{assemble, input, merge, normalize};
use lopdf::Document;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Repair the selected pages of `input` and write the result to `output`.
///
/// The rasteriser is chosen from `config.rasterizer`.
///
/// # Errors
/// Every failure is fatal and leaves nothing at `output`:
/// - the input is missing, unreadable, not a PDF, corrupt or encrypted
/// - a selected page is past the end of the document
/// - the rasteriser is missing or fails
/// - the output cannot be written
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdfinvert::{invert_pages, InvertConfig, PageSet};
///
/// let pages: PageSet = "10-13".parse()?;
/// let stats = invert_pages("scan.pdf", "fixed.pdf", &pages, &InvertConfig::default())?;
/// eprintln!("replaced {} of {} pages", stats.replaced_pages, stats.total_pages);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn invert_pages(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    pages: &PageSet,
    config: &InvertConfig,
) -> Result<InvertStats, PdfInvertError> {
    let rasterizer = render::rasterizer_for(config);
    invert_pages_with(rasterizer.as_ref(), input, output, pages, config)
}

/// Like [`invert_pages`], with a caller-supplied rasteriser.
///
/// `config.rasterizer` and `config.gs_binary` are ignored.
pub fn invert_pages_with(
    rasterizer: &dyn Rasterizer,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    pages: &PageSet,
    config: &InvertConfig,
) -> Result<InvertStats, PdfInvertError> {
    let total_start = Instant::now();
    let output = output.as_ref();

    if pages.is_empty() {
        return Err(PdfInvertError::EmptySelection);
    }

    // ── Step 1: Validate input ───────────────────────────────────────────
    let input = input::resolve_input(input)?;
    let total_pages = merge::load_pdf(&input)?.get_pages().len();
    merge::check_selection(pages, total_pages)?;
    info!(
        "Repairing pages {} of {} ({} pages) with {} at {} DPI",
        pages,
        input.display(),
        total_pages,
        rasterizer.name(),
        config.dpi
    );

    let workspace = Workspace::create()?;

    // ── Step 2: Rasterise ────────────────────────────────────────────────
    let render_start = Instant::now();
    let rasters = rasterizer.render(&input, pages, config.dpi, &workspace)?;
    if rasters.len() != pages.len() {
        return Err(PdfInvertError::ReplacementCountMismatch {
            expected: pages.len(),
            actual: rasters.len(),
        });
    }
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} pages in {}ms", rasters.len(), render_duration_ms);

    // ── Step 3: Normalise ────────────────────────────────────────────────
    let selected = pages.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(selected);
    }

    let normalize_start = Instant::now();
    let mut normalized = Vec::with_capacity(selected);
    for (seq, raster) in rasters.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(raster.page, selected);
        }

        let page = normalize::normalize(raster, config.polarity);
        let path = workspace.normalized_path(seq + 1);
        page.image.save(&path).map_err(|e| PdfInvertError::Image {
            path: path.clone(),
            source: e,
        })?;
        debug!("Normalised page {} → {}", page.page, path.display());

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page.page, selected, page.inverted);
        }
        normalized.push(page);
    }
    drop(rasters);
    let normalize_duration_ms = normalize_start.elapsed().as_millis() as u64;
    let inverted_pages = normalized.iter().filter(|p| p.inverted).count();
    info!(
        "Normalised {} pages ({} inverted) in {}ms",
        normalized.len(),
        inverted_pages,
        normalize_duration_ms
    );

    // ── Step 4: Assemble replacement document ────────────────────────────
    let assemble_start = Instant::now();
    let replacement = workspace.replacement_pdf();
    assemble::assemble(&normalized, config.dpi, &replacement)?;
    drop(normalized);
    let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

    // ── Step 5: Merge into the source ────────────────────────────────────
    let merge_start = Instant::now();
    let report = merge::merge(&input, &replacement, pages, output)?;
    let merge_duration_ms = merge_start.elapsed().as_millis() as u64;

    if let Err(e) = workspace.close() {
        warn!("{}", e);
    }

    let stats = InvertStats {
        output: output.to_path_buf(),
        total_pages: report.total_pages,
        replaced_pages: report.replaced_pages,
        inverted_pages,
        rasterizer: rasterizer.name().to_string(),
        dpi: config.dpi,
        output_bytes: report.output_bytes,
        render_duration_ms,
        normalize_duration_ms,
        assemble_duration_ms,
        merge_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Repair complete: {}/{} pages replaced, {}ms total",
        stats.replaced_pages, stats.total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(selected);
    }

    Ok(stats)
}

/// Read basic facts about a PDF without modifying it.
///
/// Unlike [`invert_pages`], encrypted documents are reported rather than
/// rejected.
pub fn inspect(path: impl AsRef<Path>) -> Result<DocumentInfo, PdfInvertError> {
    let path = input::resolve_input(path)?;
    let doc = Document::load(&path).map_err(|e| PdfInvertError::CorruptPdf {
        path: path.clone(),
        detail: e.to_string(),
    })?;

    Ok(DocumentInfo {
        page_count: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        encrypted: doc.trailer.has(b"Encrypt"),
        path,
    })
}
