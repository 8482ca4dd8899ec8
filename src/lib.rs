//! # edgequake-pdfinvert
//!
//! Repair PDF pages that were scanned or exported with inverted colours
//! (light text on a dark background).
//!
//! ## Why this crate?
//!
//! Scanners and some export pipelines occasionally produce pages with their
//! polarity flipped: white text on black, often with a muddy gray cast. Such
//! pages are hard to read and expensive to print. This crate re-renders just
//! the affected pages, forces them to crisp black-on-white, and splices them
//! back into the document. Every other page is carried over untouched.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF + "10-13"
//!  │
//!  ├─ 1. Parse     page-range expression → PageSet
//!  ├─ 2. Input     %PDF check, page count, encryption check
//!  ├─ 3. Render    rasterise selected pages (Ghostscript or pdfium)
//!  ├─ 4. Normalize grayscale → invert → autocontrast 1% → threshold 200
//!  ├─ 5. Assemble  one full-page image per PDF page (lopdf)
//!  └─ 6. Merge     swap the selected pages for the image pages (lopdf)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfinvert::{invert_pages, InvertConfig, PageSet};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pages = PageSet::parse("10-13")?;
//!     let stats = invert_pages("scan.pdf", "fixed.pdf", &pages, &InvertConfig::default())?;
//!     eprintln!("{} pages replaced in {}ms", stats.replaced_pages, stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfinvert` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-pdfinvert = { version = "0.1", default-features = false }
//! ```
//!
//! ## Choosing a Rasteriser
//!
//! | Backend | Needs | Notes |
//! |---------|-------|-------|
//! | `gs`     | Ghostscript on `PATH` | Default; `png16m` device |
//! | `pdfium` | `libpdfium` (`PDFIUM_LIB_PATH`, `./` or system) | In-process, no subprocess |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{InvertConfig, InvertConfigBuilder, PolarityPolicy, RasterizerKind, DEFAULT_DPI};
pub use convert::{inspect, invert_pages, invert_pages_with};
pub use error::{PageRangeError, PdfInvertError};
pub use output::{DocumentInfo, InvertStats};
pub use pages::PageSet;
pub use pipeline::render::{RasterImage, Rasterizer};
pub use progress::{InvertProgressCallback, NoopProgressCallback, ProgressCallback};
