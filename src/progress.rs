//! Progress-callback trait for per-page repair events.
//!
//! Inject an [`Arc<dyn InvertProgressCallback>`] via
//! [`crate::config::InvertConfigBuilder::progress_callback`] to receive
//! events as the pipeline normalises each selected page. The CLI turns these
//! into an `indicatif` progress bar; library users can forward them
//! anywhere.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfinvert::{InvertConfig, InvertProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl InvertProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: u32, total_pages: usize, inverted: bool) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("page {page_num} ({done}/{total_pages}) inverted={inverted}");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//! let config = InvertConfig::builder()
//!     .progress_callback(counter as Arc<dyn InvertProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each selected page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, but the trait is
/// `Send + Sync` so one callback can be shared with other threads.
pub trait InvertProgressCallback: Send + Sync {
    /// Called once after rasterisation, before the first page is normalised.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is normalised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number in the source document
    /// * `total_pages` — number of selected pages
    fn on_page_start(&self, page_num: u32, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been normalised and written to the workspace.
    ///
    /// `inverted` is false when the polarity policy skipped the invert step.
    fn on_page_complete(&self, page_num: u32, total_pages: usize, inverted: bool) {
        let _ = (page_num, total_pages, inverted);
    }

    /// Called once after the output document has been written.
    fn on_run_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl InvertProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::InvertConfig`].
pub type ProgressCallback = Arc<dyn InvertProgressCallback>;
