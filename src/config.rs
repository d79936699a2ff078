//! Configuration types for PDF text extraction.
//!
//! Everything that changes the pipeline's output lives in one
//! [`ExtractionConfig`], built via [`ExtractionConfigBuilder`]. The same config
//! drives extraction and combination, so a rerun with the same flags produces
//! the same files.

use crate::error::Pdf2TxtError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 200;
/// Default name of the combined document inside the output directory.
pub const DEFAULT_COMBINED_FILE_NAME: &str = "combined_text.txt";

/// Configuration for a PDF-to-text extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2txt::{Binarization, ExtractionConfig};
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .language("deu")
///     .binarization(Binarization::Otsu)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each page. Range: 72–600. Default: 200.
    ///
    /// Tesseract is tuned for glyphs roughly 20–30 px tall; 200 DPI gets body
    /// text there on typical scans. Raise to 300 for small print.
    pub dpi: u32,

    /// Maximum rendered edge length in pixels. Default: 6000.
    ///
    /// Caps either dimension regardless of DPI so a poster-sized page cannot
    /// exhaust memory.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Contrast enhancement factor applied after grayscale. Default: 2.0.
    ///
    /// `1.0` leaves the image unchanged; values above 1 push pixels away from
    /// the image mean.
    pub contrast: f32,

    /// Binarization applied after contrast enhancement. Default: fixed at 150.
    pub binarization: Binarization,

    /// Minimum length of the shorter image edge after preprocessing. Default: 0 (off).
    ///
    /// Pages smaller than this are upscaled proportionally before OCR.
    pub min_dimension: u32,

    /// Tesseract language code(s), e.g. `eng` or `eng+fra`. Default: `eng`.
    pub language: String,

    /// Tesseract page segmentation mode (`--psm`). Default: engine default.
    pub page_segmentation_mode: Option<u8>,

    /// Program name or path used to run Tesseract. Default: `tesseract`.
    pub tesseract_program: String,

    /// Separator inserted between pages in the combined document. Default: [`PageSeparator::Rule`].
    pub page_separator: PageSeparator,

    /// File name of the combined document. Default: `combined_text.txt`.
    pub combined_file_name: String,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 6000,
            password: None,
            pages: PageSelection::default(),
            contrast: 2.0,
            binarization: Binarization::default(),
            min_dimension: 0,
            language: "eng".to_string(),
            page_segmentation_mode: None,
            tesseract_program: "tesseract".to_string(),
            page_separator: PageSeparator::default(),
            combined_file_name: DEFAULT_COMBINED_FILE_NAME.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("contrast", &self.contrast)
            .field("binarization", &self.binarization)
            .field("min_dimension", &self.min_dimension)
            .field("language", &self.language)
            .field("page_segmentation_mode", &self.page_segmentation_mode)
            .field("tesseract_program", &self.tesseract_program)
            .field("page_separator", &self.page_separator)
            .field("combined_file_name", &self.combined_file_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn contrast(mut self, factor: f32) -> Self {
        self.config.contrast = factor;
        self
    }

    pub fn binarization(mut self, mode: Binarization) -> Self {
        self.config.binarization = mode;
        self
    }

    pub fn min_dimension(mut self, px: u32) -> Self {
        self.config.min_dimension = px;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.config.page_segmentation_mode = Some(psm);
        self
    }

    pub fn tesseract_program(mut self, program: impl Into<String>) -> Self {
        self.config.tesseract_program = program.into();
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn combined_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.combined_file_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2TxtError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Pdf2TxtError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if !(c.contrast.is_finite() && c.contrast > 0.0) {
            return Err(Pdf2TxtError::InvalidConfig(format!(
                "Contrast factor must be > 0, got {}",
                c.contrast
            )));
        }
        if c.language.trim().is_empty() {
            return Err(Pdf2TxtError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if let Some(psm) = c.page_segmentation_mode {
            if psm > 13 {
                return Err(Pdf2TxtError::InvalidConfig(format!(
                    "Page segmentation mode must be 0–13, got {psm}"
                )));
            }
        }
        let name = c.combined_file_name.trim();
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(Pdf2TxtError::InvalidConfig(format!(
                "Combined file name must be a plain file name, got '{}'",
                c.combined_file_name
            )));
        }
        if crate::pipeline::write::parse_page_file_name(name).is_some() {
            return Err(Pdf2TxtError::InvalidConfig(format!(
                "Combined file name '{name}' collides with the page file pattern"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the preprocessor turns the contrast-enhanced grayscale page into
/// black-and-white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Binarization {
    /// Pixels strictly above the level become white, the rest black.
    Fixed(u8),
    /// Level picked per page with Otsu's method.
    Otsu,
    /// Keep the grayscale image.
    Off,
}

impl Default for Binarization {
    fn default() -> Self {
        Binarization::Fixed(150)
    }
}

/// Specifies which pages of the PDF to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Extract all pages (default).
    #[default]
    All,
    /// Extract a single page (1-indexed).
    Single(usize),
    /// Extract a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Extract specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// How to separate pages in the combined document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line, 80 dashes, blank line. Survives pasting into word
    /// processors as a visible page break. (default)
    #[default]
    Rule,
    /// A single blank line.
    Blank,
    /// ASCII form feed on its own line; printers and `less` treat it as a page break.
    FormFeed,
    /// Marker naming the page that follows: "--- page N ---".
    Marker,
    /// Custom string inserted between pages, surrounded by blank lines.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed before the given page (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::Rule => format!("\n\n{}\n\n", "-".repeat(80)),
            PageSeparator::Blank => "\n\n".to_string(),
            PageSeparator::FormFeed => "\n\u{c}\n".to_string(),
            PageSeparator::Marker => format!("\n\n--- page {} ---\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ExtractionConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.contrast, 2.0);
        assert_eq!(c.binarization, Binarization::Fixed(150));
        assert_eq!(c.language, "eng");
        assert_eq!(c.combined_file_name, "combined_text.txt");
        assert_eq!(c.page_separator, PageSeparator::Rule);
    }

    #[test]
    fn build_rejects_out_of_range_dpi() {
        assert!(ExtractionConfig::builder().dpi(50).build().is_err());
        assert!(ExtractionConfig::builder().dpi(1200).build().is_err());
        assert!(ExtractionConfig::builder().dpi(600).build().is_ok());
    }

    #[test]
    fn build_rejects_bad_contrast_and_language() {
        assert!(ExtractionConfig::builder().contrast(0.0).build().is_err());
        assert!(ExtractionConfig::builder().contrast(f32::NAN).build().is_err());
        assert!(ExtractionConfig::builder().language("  ").build().is_err());
    }

    #[test]
    fn build_rejects_combined_name_that_looks_like_a_page() {
        let err = ExtractionConfig::builder()
            .combined_file_name("page_001.txt")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("collides"), "got: {err}");
        assert!(ExtractionConfig::builder()
            .combined_file_name("../escape.txt")
            .build()
            .is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }

    #[test]
    fn separator_rendering() {
        assert_eq!(PageSeparator::Blank.render(2), "\n\n");
        assert_eq!(PageSeparator::Rule.render(2).matches('-').count(), 80);
        assert_eq!(PageSeparator::Marker.render(7), "\n\n--- page 7 ---\n\n");
        assert_eq!(PageSeparator::Custom("***".into()).render(1), "\n\n***\n\n");
    }
}
