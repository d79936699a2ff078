//! # edgequake-pdf2txt
//!
//! Extract text from scanned PDF documents with OCR.
//!
//! ## Why this crate?
//!
//! A scanned PDF is a stack of page photographs: there is no text layer for
//! `pdftotext` to pull out. This crate renders each page to an image, cleans
//! the image up for OCR, runs Tesseract on it and writes one text file per
//! page. The page files can then be joined into a single document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       check the file is a readable PDF
//!  ├─ 2. Render      rasterise pages via pdfium, one at a time (spawn_blocking)
//!  ├─ 3. Preprocess  grayscale → contrast ×2 → threshold 150
//!  ├─ 4. Recognize   tesseract, behind the TextRecognizer trait
//!  ├─ 5. Cleanup     form feeds, line endings, ligatures, whitespace
//!  ├─ 6. Write       output_dir/page_001.txt, page_002.txt, …
//!  └─ 7. Combine     (optional) output_dir/combined_text.txt
//! ```
//!
//! A page that fails at any stage is recorded in the report and skipped; the
//! run goes on with the next page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2txt::{run, ExtractionConfig, RunRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::default();
//!     let request = RunRequest::extract("scan.pdf", "out").with_combine(true);
//!     let summary = run(&request, &config).await?;
//!     if let Some(ref report) = summary.extraction {
//!         eprintln!("{}/{} pages",
//!             report.stats.succeeded_pages,
//!             report.stats.attempted_pages);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Requirements
//!
//! - a pdfium shared library (`PDFIUM_LIB_PATH`, the working directory, or the
//!   system library path)
//! - the `tesseract` program with the requested language data
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2txt` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2txt = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod combine;
pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use combine::{combine, combine_through};
pub use config::{
    Binarization, ExtractionConfig, ExtractionConfigBuilder, PageSelection, PageSeparator,
    DEFAULT_COMBINED_FILE_NAME, DEFAULT_DPI,
};
pub use driver::{run, run_document, run_with, Mode, RunRequest, Stage};
pub use error::{
    CombineError, PageError, Pdf2TxtError, PreprocessError, RecognitionError, RenderError,
    WriteError,
};
pub use extract::extract_pages;
pub use output::{
    CombineReport, CombineStatus, ExtractionReport, ExtractionStats, PageRange, PageResult,
    RunSummary,
};
pub use pipeline::recognize::{TesseractCli, TextRecognizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
