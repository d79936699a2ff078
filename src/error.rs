//! Error types for the edgequake-pdf2txt library.
//!
//! Errors are grouped by pipeline stage, and every group falls on one side of
//! a single line:
//!
//! * **Fatal** — the run cannot proceed: [`RenderError`] (bad document,
//!   missing pdfium), [`WriteError::DirectoryUnwritable`], an OCR engine that
//!   is not installed, or a [`CombineError`] in combine-only mode. These
//!   surface as `Err(Pdf2TxtError)` from [`crate::driver::run`] and friends.
//!   A combine that fails after extraction is reported in the summary instead.
//!
//! * **Non-fatal** — one page failed (render glitch, OCR crash, a single file
//!   that could not be written). The stage error is downgraded to a
//!   [`PageError`] and stored in [`crate::output::PageResult`]; the remaining
//!   pages are still processed.

use std::path::PathBuf;
use thiserror::Error;

/// Document-level rendering failures. Always fatal.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium must be installed before running pdf2txt. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    /// The rendering thread died before reporting the document state.
    #[error("Render worker stopped unexpectedly: {0}")]
    WorkerFailed(String),
}

/// Failures turning a rendered page into an OCR-ready raster.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The page rendered to a zero-area bitmap.
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Upscaling would exceed the pixel budget.
    #[error("Upscaled image would be {width}x{height}, above the {max}px limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Failures running the OCR engine.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The engine binary is missing or cannot be executed.
    #[error(
        "OCR engine '{program}' is not available: {detail}\n\n\
Install Tesseract OCR:\n\
  Ubuntu/Debian: sudo apt install tesseract-ocr\n\
  macOS:         brew install tesseract\n\
  Windows:       https://github.com/UB-Mannheim/tesseract/wiki\n"
    )]
    EngineUnavailable { program: String, detail: String },

    /// The engine ran but exited unsuccessfully.
    #[error("OCR engine '{program}' exited with {status}: {stderr}")]
    EngineFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The page image could not be handed to the engine.
    #[error("Failed to stage image for OCR: {0}")]
    Staging(String),
}

/// Failures persisting page text.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output directory could not be created or is not writable. Fatal.
    #[error("Output directory '{path}' is not writable: {source}")]
    DirectoryUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single page file could not be written.
    #[error("Failed to write '{path}': {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures combining page files. Fatal to the combine step only.
#[derive(Debug, Error)]
pub enum CombineError {
    /// The output directory does not exist.
    #[error("Output directory '{path}' does not exist")]
    DirectoryMissing { path: PathBuf },

    /// The directory exists but holds no `page_<N>.txt` files.
    #[error("No page text files found in '{path}'\nRun an extraction first, or check --output-dir.")]
    NoPageFiles { path: PathBuf },

    /// Listing the directory failed.
    #[error("Failed to list '{path}': {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every discovered page file failed to read.
    #[error("None of the {count} page files in '{path}' could be read")]
    NothingReadable { path: PathBuf, count: usize },

    /// Could not write the combined document.
    #[error("Failed to write combined file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// All fatal errors returned by the edgequake-pdf2txt library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2TxtError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The requested mode is incoherent (e.g. extraction without a document).
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// Extraction continues with the next page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    Render { page: usize, detail: String },

    /// Preprocessing rejected the rendered image.
    #[error("Page {page}: preprocessing failed: {detail}")]
    Preprocess { page: usize, detail: String },

    /// The OCR engine failed on this page.
    #[error("Page {page}: recognition failed: {detail}")]
    Recognition { page: usize, detail: String },

    /// The page file could not be written.
    #[error("Page {page}: write failed: {detail}")]
    Write { page: usize, detail: String },

    /// The per-page worker panicked.
    #[error("Page {page}: worker panicked: {detail}")]
    Panicked { page: usize, detail: String },
}

impl PageError {
    /// The 1-based page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Render { page, .. }
            | PageError::Preprocess { page, .. }
            | PageError::Recognition { page, .. }
            | PageError::Write { page, .. }
            | PageError::Panicked { page, .. } => *page,
        }
    }

    /// Short machine-readable stage name, used in summaries.
    pub fn stage(&self) -> &'static str {
        match self {
            PageError::Render { .. } => "render",
            PageError::Preprocess { .. } => "preprocess",
            PageError::Recognition { .. } => "recognition",
            PageError::Write { .. } => "write",
            PageError::Panicked { .. } => "panic",
        }
    }

    pub(crate) fn preprocess(page: usize, err: PreprocessError) -> Self {
        PageError::Preprocess {
            page,
            detail: err.to_string(),
        }
    }

    pub(crate) fn recognition(page: usize, err: RecognitionError) -> Self {
        PageError::Recognition {
            page,
            detail: err.to_string(),
        }
    }

    pub(crate) fn write(page: usize, err: WriteError) -> Self {
        PageError::Write {
            page,
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display_names_path() {
        let e = RenderError::NotAPdf {
            path: PathBuf::from("/tmp/scan.png"),
            magic: *b"\x89PNG",
        };
        assert!(e.to_string().contains("/tmp/scan.png"), "got: {e}");
    }

    #[test]
    fn engine_unavailable_has_install_hint() {
        let e = RecognitionError::EngineUnavailable {
            program: "tesseract".into(),
            detail: "No such file or directory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tesseract"));
        assert!(msg.contains("apt install"));
    }

    #[test]
    fn umbrella_is_transparent() {
        let e: Pdf2TxtError = CombineError::NoPageFiles {
            path: PathBuf::from("out"),
        }
        .into();
        assert!(e.to_string().starts_with("No page text files found in 'out'"));
    }

    #[test]
    fn page_error_accessors() {
        let e = PageError::recognition(
            4,
            RecognitionError::EngineFailed {
                program: "tesseract".into(),
                status: "exit status: 1".into(),
                stderr: "segfault".into(),
            },
        );
        assert_eq!(e.page(), 4);
        assert_eq!(e.stage(), "recognition");
        assert!(e.to_string().starts_with("Page 4: recognition failed"));
    }

    #[test]
    fn page_error_serializes() {
        let e = PageError::Write {
            page: 2,
            detail: "disk full".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("disk full"));
    }
}
