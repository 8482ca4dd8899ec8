//! CLI binary for edgequake-pdfinvert.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `InvertConfig` and reports where the output went.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use edgequake_pdfinvert::{
    invert_pages, InvertConfig, InvertProgressCallback, PageSet, PolarityPolicy, ProgressCallback,
    RasterizerKind, DEFAULT_DPI,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the rasteriser runs, then a
/// bar with one log line per normalised page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner-only until `on_run_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Rendering");
        bar.set_message("Rasterising selected pages…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Normalising");
        self.bar.reset_eta();
    }

    /// Stop the spinner and wipe it so an error message prints on a clean line.
    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl InvertProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Repairing {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: u32, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: u32, _total: usize, inverted: bool) {
        let action = if inverted { "inverted" } else { "kept polarity" };
        self.bar.println(format!(
            "  {} Page {:>4}  {}",
            green("✓"),
            page_num,
            dim(action),
        ));
        self.bar.inc(1);
        if self.bar.position() == self.bar.length().unwrap_or(0) {
            self.bar.set_prefix("Merging");
        }
    }

    fn on_run_complete(&self, total_pages: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages repaired",
            green("✔"),
            bold(&total_pages.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Repair pages 10 to 13
  pdfinvert scan.pdf fixed.pdf 10-13

  # Several ranges and single pages
  pdfinvert scan.pdf fixed.pdf "1-3, 7, 20-22"

  # Only invert pages that are actually dark
  pdfinvert --polarity auto scan.pdf fixed.pdf 1-200

  # Render in-process with pdfium instead of Ghostscript
  pdfinvert --rasterizer pdfium scan.pdf fixed.pdf 4

  # Machine-readable run statistics
  pdfinvert --json scan.pdf fixed.pdf 10-13 > stats.json

PAGE RANGES:
  Comma-separated 1-based page numbers or inclusive ranges: "1-3,5,9-10".
  Order and duplicates do not matter. Pages past the end of the document
  are an error and nothing is written.

ENVIRONMENT VARIABLES:
  PDFINVERT_DPI           Rendering resolution (72-600)
  PDFINVERT_RASTERIZER    gs or pdfium
  PDFINVERT_GS_BINARY     Ghostscript executable (e.g. gswin64c)
  PDFINVERT_POLARITY      always or auto
  PDFIUM_LIB_PATH         Path to libpdfium for --rasterizer pdfium
  RUST_LOG                Override log filtering
"#;

/// Repair colour-inverted pages of a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfinvert",
    version,
    about = "Repair colour-inverted pages of a PDF",
    long_about = "Re-render the selected pages of a PDF, force them to black text on a white \
background, and splice them back into the document. Pages that are not selected are copied \
through untouched.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source PDF.
    input: PathBuf,

    /// Where to write the repaired PDF.
    output: PathBuf,

    /// Pages to repair, e.g. 10-13 or "1-3,5".
    range: String,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDFINVERT_DPI", default_value_t = DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Rasteriser backend.
    #[arg(long, env = "PDFINVERT_RASTERIZER", value_enum, default_value = "gs")]
    rasterizer: RasterizerArg,

    /// Ghostscript executable name or path.
    #[arg(long, env = "PDFINVERT_GS_BINARY", default_value = "gs")]
    gs_binary: String,

    /// Which selected pages get inverted: always, or auto (only dark pages).
    #[arg(long, env = "PDFINVERT_POLARITY", value_enum, default_value = "always")]
    polarity: PolarityArg,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "PDFINVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFINVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFINVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFINVERT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RasterizerArg {
    Gs,
    Pdfium,
}

impl From<RasterizerArg> for RasterizerKind {
    fn from(v: RasterizerArg) -> Self {
        match v {
            RasterizerArg::Gs => RasterizerKind::Ghostscript,
            RasterizerArg::Pdfium => RasterizerKind::Pdfium,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PolarityArg {
    Always,
    Auto,
}

impl From<PolarityArg> for PolarityPolicy {
    fn from(v: PolarityArg) -> Self {
        match v {
            PolarityArg::Always => PolarityPolicy::Always,
            PolarityArg::Auto => PolarityPolicy::Auto,
        }
    }
}

fn main() -> Result<()> {
    // Usage errors exit with status 1; help and version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Parse before anything touches the filesystem.
    let pages = PageSet::parse(&cli.range)
        .with_context(|| format!("Invalid page range '{}'", cli.range))?;

    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = progress
        .clone()
        .map(|cb| cb as Arc<dyn InvertProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    let result = invert_pages(&cli.input, &cli.output, &pages, &config);
    if let (Err(_), Some(progress)) = (&result, &progress) {
        progress.clear();
    }
    let stats = result.with_context(|| {
        format!(
            "Failed to repair pages {} of {}",
            pages,
            cli.input.display()
        )
    })?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).context("Failed to serialise statistics")?
        );
    }

    if !cli.quiet {
        eprintln!("Your output is written to: {}", cli.output.display());
        if !cli.json {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{}/{} pages replaced ({} inverted)  —  {}ms total",
                    stats.replaced_pages,
                    stats.total_pages,
                    stats.inverted_pages,
                    stats.total_duration_ms
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `InvertConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<InvertConfig> {
    let mut builder = InvertConfig::builder()
        .dpi(cli.dpi)
        .rasterizer(cli.rasterizer.into())
        .gs_binary(cli.gs_binary.clone())
        .polarity(cli.polarity.into());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
