//! Pipeline stages for PDF-to-text extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested alone and the rendering or OCR backend can change without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ preprocess ──▶ recognize ──▶ cleanup ──▶ write
//! (path)    (pdfium)   (gray+bin)     (tesseract)   (text)      (page_NNN.txt)
//! ```
//!
//! 1. [`input`]      — check the path names a readable PDF
//! 2. [`render`]     — rasterise pages lazily on a blocking thread
//! 3. [`preprocess`] — grayscale, contrast, binarization, optional upscale
//! 4. [`recognize`]  — run the OCR engine behind [`recognize::TextRecognizer`]
//! 5. [`cleanup`]    — deterministic normalisation of raw OCR text
//! 6. [`write`]      — atomic per-page files with order-preserving names

pub mod cleanup;
pub mod input;
pub mod preprocess;
pub mod recognize;
pub mod render;
pub mod write;
