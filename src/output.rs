//! Result types returned by the public API.

use serde::Serialize;
use std::path::PathBuf;

/// Statistics for one repair run.
///
/// Serialised verbatim by the CLI's `--json` flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvertStats {
    /// Where the repaired document was written.
    pub output: PathBuf,
    /// Pages in the source (and output) document.
    pub total_pages: usize,
    /// Pages replaced by normalised image pages.
    pub replaced_pages: usize,
    /// Replaced pages whose colours were inverted. Equal to
    /// `replaced_pages` unless the polarity policy is `auto`.
    pub inverted_pages: usize,
    /// Rasteriser backend that rendered the pages.
    pub rasterizer: String,
    /// Resolution the pages were rendered at.
    pub dpi: u32,
    /// Size of the output file in bytes.
    pub output_bytes: usize,

    pub render_duration_ms: u64,
    pub normalize_duration_ms: u64,
    pub assemble_duration_ms: u64,
    pub merge_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Basic facts about a PDF, obtained without modifying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    /// Header version, e.g. `"1.5"`.
    pub pdf_version: String,
    /// True when the trailer carries an `/Encrypt` dictionary.
    pub encrypted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialise_with_field_names() {
        let stats = InvertStats {
            output: PathBuf::from("out.pdf"),
            total_pages: 20,
            replaced_pages: 4,
            inverted_pages: 4,
            rasterizer: "gs".into(),
            dpi: 300,
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_pages"], 20);
        assert_eq!(json["replaced_pages"], 4);
        assert_eq!(json["output"], "out.pdf");
        assert_eq!(json["merge_duration_ms"], 0);
    }
}
