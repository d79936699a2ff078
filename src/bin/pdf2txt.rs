//! CLI binary for edgequake-pdf2txt.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` + `RunRequest` and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2txt::{
    run, Binarization, CombineStatus, ExtractionConfig, ExtractionProgressCallback, PageSelection,
    PageSeparator, ProgressCallback, RunRequest, RunSummary, DEFAULT_COMBINED_FILE_NAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

/// Terminal progress callback: a live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the page currently in flight.
    page_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_extraction_start` gives it a length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("OCR");
        self.bar.reset_eta();
    }

    fn page_elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting text from {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, chars: usize) {
        let secs = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{chars:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.page_elapsed_secs();
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

/// Keep log lines to one terminal row.
fn truncate(s: &str, max_chars: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    if first_line.chars().count() > max_chars {
        let head: String = first_line.chars().take(max_chars - 1).collect();
        format!("{head}\u{2026}")
    } else {
        first_line.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR every page into out/page_001.txt, out/page_002.txt, …
  pdf2txt --pdf-path scan.pdf --output-dir out

  # OCR and join the pages into out/combined_text.txt
  pdf2txt --pdf-path scan.pdf --output-dir out --combine

  # Re-join existing page files without running OCR
  pdf2txt --output-dir out --skip-extraction

  # German text, 300 DPI, Otsu thresholding, pages 3 to 15
  pdf2txt --pdf-path scan.pdf --output-dir out --lang deu --dpi 300 --binarize otsu --pages 3-15

  # Machine-readable summary
  pdf2txt --pdf-path scan.pdf --output-dir out --combine --json > summary.json

SEPARATORS (--separator):
  rule       blank line, 80 dashes, blank line (default)
  blank      one blank line
  formfeed   ASCII form feed on its own line
  marker     "--- page N ---"
  <text>     any other value is used verbatim between blank lines

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override log filter, e.g. RUST_LOG=edgequake_pdf2txt=debug
  PDF2TXT_*         Every flag, e.g. PDF2TXT_DPI=300, PDF2TXT_LANG=fra

REQUIREMENTS:
  pdfium shared library   https://github.com/bblanchon/pdfium-binaries
  tesseract               apt install tesseract-ocr / brew install tesseract
"#;

/// Extract text from scanned PDFs with OCR.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2txt",
    version,
    about = "Extract text from scanned PDFs with OCR",
    long_about = "Render each page of a scanned PDF, clean the image up for OCR, run \
Tesseract on it and write one text file per page. Optionally join the page files into a \
single document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF document to extract. Required unless --skip-extraction.
    #[arg(
        long = "pdf-path",
        alias = "pdf_path",
        env = "PDF2TXT_PDF_PATH",
        required_unless_present = "skip_extraction"
    )]
    pdf_path: Option<PathBuf>,

    /// Directory for page files and the combined document.
    #[arg(long = "output-dir", alias = "output_dir", env = "PDF2TXT_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Join page files into one document after extraction.
    #[arg(long, env = "PDF2TXT_COMBINE")]
    combine: bool,

    /// Only combine existing page files; no rendering or OCR.
    #[arg(long = "skip-extraction", alias = "skip_extraction", env = "PDF2TXT_SKIP_EXTRACTION")]
    skip_extraction: bool,

    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF2TXT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "PDF2TXT_LANG", default_value = "eng")]
    lang: String,

    /// Tesseract page segmentation mode (0–13).
    #[arg(long, env = "PDF2TXT_PSM",
          value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// Tesseract program name or path.
    #[arg(long, env = "PDF2TXT_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// Contrast enhancement factor (1.0 = unchanged).
    #[arg(long, env = "PDF2TXT_CONTRAST", default_value_t = 2.0)]
    contrast: f32,

    /// Binarization: fixed:<0-255>, otsu, or off.
    #[arg(long, env = "PDF2TXT_BINARIZE", default_value = "fixed:150")]
    binarize: String,

    /// Upscale pages whose shorter edge is below this many pixels (0 = off).
    #[arg(long, env = "PDF2TXT_MIN_DIMENSION", default_value_t = 0)]
    min_dimension: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2TXT_PAGES", default_value = "all")]
    pages: String,

    /// Page separator in the combined document: rule, blank, formfeed, marker, or custom text.
    #[arg(long, env = "PDF2TXT_SEPARATOR", default_value = "rule")]
    separator: String,

    /// File name of the combined document inside the output directory.
    #[arg(long, env = "PDF2TXT_COMBINED_NAME", default_value = DEFAULT_COMBINED_FILE_NAME)]
    combined_name: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2TXT_PASSWORD")]
    password: Option<String>,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "PDF2TXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2TXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2TXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2TXT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.skip_extraction;
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

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ExtractionProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    let request = if cli.skip_extraction {
        RunRequest::combine_only(&cli.output_dir)
    } else {
        let pdf_path = cli
            .pdf_path
            .clone()
            .context("--pdf-path is required unless --skip-extraction is set")?;
        RunRequest::extract(pdf_path, &cli.output_dir).with_combine(cli.combine)
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = match run(&request, &config).await {
        Ok(s) => s,
        Err(e) => {
            if let Some(ref cb) = cli_progress {
                cb.bar.finish_and_clear();
            }
            let what = if cli.skip_extraction {
                format!("Combining page files in {}", cli.output_dir.display())
            } else {
                format!(
                    "Extracting {}",
                    request
                        .pdf_path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                )
            };
            return Err(anyhow::Error::new(e).context(format!("{what} failed")));
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary, &cli.output_dir);
    }

    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Human-readable summary on stderr.
fn print_summary(summary: &RunSummary, output_dir: &std::path::Path) {
    if let Some(ref report) = summary.extraction {
        let stats = &report.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.succeeded_pages,
            stats.attempted_pages,
            stats.total_duration_ms,
            bold(&output_dir.display().to_string()),
        );
        eprintln!(
            "   {} pages in document  /  {} files written  /  {}ms in OCR",
            dim(&stats.total_pages.to_string()),
            dim(&report.written_paths().count().to_string()),
            dim(&stats.ocr_duration_ms.to_string()),
        );
        for failure in report.failures() {
            eprintln!("   {} {}", red("✗"), failure);
        }
    }

    match summary.combine {
        None => {}
        Some(CombineStatus::Combined(ref c)) => {
            eprintln!(
                "{}  combined {} pages  →  {}",
                green("✔"),
                c.pages_combined.len(),
                bold(&c.path.display().to_string()),
            );
            if !c.missing_pages.is_empty() {
                let missing: Vec<String> = c.missing_pages.iter().map(|p| p.to_string()).collect();
                eprintln!(
                    "   {} {} missing pages: {}",
                    cyan("⚠"),
                    c.missing_count(),
                    missing.join(", ")
                );
            }
            for path in &c.unreadable {
                eprintln!("   {} unreadable: {}", cyan("⚠"), path.display());
            }
        }
        Some(CombineStatus::Failed { ref reason }) => {
            eprintln!("{}  combine failed: {}", red("✘"), reason);
        }
    }

    if summary.extraction.is_some() && !summary.combine_ran() {
        eprintln!("   {}", dim("add --combine to join the pages into one file"));
    }
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;
    let separator = parse_separator(&cli.separator);
    let binarization = parse_binarization(&cli.binarize)?;

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .pages(pages)
        .contrast(cli.contrast)
        .binarization(binarization)
        .min_dimension(cli.min_dimension)
        .language(&cli.lang)
        .tesseract_program(&cli.tesseract)
        .page_separator(separator)
        .combined_file_name(&cli.combined_name);

    if let Some(psm) = cli.psm {
        builder = builder.page_segmentation_mode(psm);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "rule" | "---" => PageSeparator::Rule,
        "blank" | "none" => PageSeparator::Blank,
        "formfeed" | "ff" => PageSeparator::FormFeed,
        "marker" => PageSeparator::Marker,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

/// Parse `--binarize` string into `Binarization`.
fn parse_binarization(s: &str) -> Result<Binarization> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "otsu" => return Ok(Binarization::Otsu),
        "off" | "none" => return Ok(Binarization::Off),
        "fixed" => return Ok(Binarization::default()),
        _ => {}
    }

    let level = s.strip_prefix("fixed:").unwrap_or(&s);
    let level: u8 = level
        .trim()
        .parse()
        .with_context(|| format!("Invalid --binarize '{s}': expected fixed:<0-255>, otsu, or off"))?;
    Ok(Binarization::Fixed(level))
}
