//! Configuration types for repairing inverted PDF pages.
//!
//! All run behaviour is controlled through [`InvertConfig`], built via its
//! [`InvertConfigBuilder`]. The image transform itself is fixed (see
//! [`crate::pipeline::normalize`]); the knobs here choose *how* pages are
//! rasterised and *which* of the selected pages get inverted.

use crate::error::PdfInvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rasterisation resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for one repair run.
///
/// Built via [`InvertConfig::builder()`] or using [`InvertConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdfinvert::{InvertConfig, PolarityPolicy, RasterizerKind};
///
/// let config = InvertConfig::builder()
///     .dpi(200)
///     .rasterizer(RasterizerKind::Pdfium)
///     .polarity(PolarityPolicy::Auto)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Clone)]
pub struct InvertConfig {
    /// Rendering DPI used when rasterising each selected page. Range: 72–600. Default: 300.
    ///
    /// The replacement page keeps the physical size of the original: pixel
    /// dimensions are divided by this value when sizing the new MediaBox.
    pub dpi: u32,

    /// Which rasteriser backend renders the selected pages. Default: Ghostscript.
    pub rasterizer: RasterizerKind,

    /// Ghostscript executable name or path. Default: `gs`.
    pub gs_binary: String,

    /// Which selected pages are inverted before thresholding. Default: Always.
    pub polarity: PolarityPolicy,

    /// Optional progress callback for per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for InvertConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            rasterizer: RasterizerKind::default(),
            gs_binary: "gs".to_string(),
            polarity: PolarityPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for InvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvertConfig")
            .field("dpi", &self.dpi)
            .field("rasterizer", &self.rasterizer)
            .field("gs_binary", &self.gs_binary)
            .field("polarity", &self.polarity)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn InvertProgressCallback>"),
            )
            .finish()
    }
}

impl InvertConfig {
    /// Create a new builder for `InvertConfig`.
    pub fn builder() -> InvertConfigBuilder {
        InvertConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`InvertConfig`].
#[derive(Debug)]
pub struct InvertConfigBuilder {
    config: InvertConfig,
}

impl InvertConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn rasterizer(mut self, kind: RasterizerKind) -> Self {
        self.config.rasterizer = kind;
        self
    }

    pub fn gs_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.gs_binary = binary.into();
        self
    }

    pub fn polarity(mut self, policy: PolarityPolicy) -> Self {
        self.config.polarity = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<InvertConfig, PdfInvertError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(PdfInvertError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.rasterizer == RasterizerKind::Ghostscript && c.gs_binary.trim().is_empty() {
            return Err(PdfInvertError::InvalidConfig(
                "Ghostscript binary must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Rasteriser backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterizerKind {
    /// Ghostscript subprocess (`png16m` device). (default)
    #[default]
    Ghostscript,
    /// In-process pdfium via `pdfium-render`.
    Pdfium,
}

/// Decides, per page, whether the invert step runs.
///
/// | Policy | Behaviour |
/// |--------|-----------|
/// | `Always` | every selected page is inverted (default) |
/// | `Auto`   | only pages whose mean luminance is below [`PolarityPolicy::DARK_MEAN`] |
///
/// A black-on-white page pushed through `Always` comes out white-on-black;
/// `Auto` guards mixed selections against that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarityPolicy {
    #[default]
    Always,
    Auto,
}

impl PolarityPolicy {
    /// Mean grayscale value below which a page counts as dark.
    pub const DARK_MEAN: f64 = 128.0;

    /// Whether a page with the given mean luminance should be inverted.
    pub fn needs_inversion(&self, mean_luma: f64) -> bool {
        match self {
            PolarityPolicy::Always => true,
            PolarityPolicy::Auto => mean_luma < Self::DARK_MEAN,
        }
    }
}
