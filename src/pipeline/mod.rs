//! Pipeline stages for repairing inverted PDF pages.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rasteriser backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ normalize ──▶ assemble ──▶ merge
//! (%PDF)    (gs/pdfium) (bilevel)    (lopdf)      (lopdf)
//! ```
//!
//! 1. [`input`]     — check the user-supplied path is a readable PDF
//! 2. [`render`]    — rasterise the selected pages into the workspace
//! 3. [`normalize`] — grayscale, invert, autocontrast, threshold
//! 4. [`assemble`]  — one image page per normalised bitmap
//! 5. [`merge`]     — splice the image pages into the source document
//!
//! All intermediate files live in a [`workspace::Workspace`].

pub mod assemble;
pub mod input;
pub mod merge;
pub mod normalize;
pub mod render;
pub mod workspace;
