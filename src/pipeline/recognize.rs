//! OCR: hand a preprocessed page to a recognition engine and collect its text.
//!
//! Engines sit behind [`TextRecognizer`] so the driver never knows which one
//! it is talking to. The shipped engine drives the `tesseract` command-line
//! program; tests substitute in-process fakes.
//!
//! Recognition is blocking and CPU-heavy. The driver calls it from
//! `spawn_blocking`, one page at a time.

use crate::config::ExtractionConfig;
use crate::error::RecognitionError;
use crate::pipeline::preprocess::PreprocessedImage;
use image::ImageFormat;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// An OCR engine.
pub trait TextRecognizer: Send + Sync {
    /// Engine identifier, used in logs.
    fn name(&self) -> &str;

    /// Recognize the text on one page. No text is `Ok(String::new())`.
    fn recognize(&self, page: &PreprocessedImage) -> Result<String, RecognitionError>;

    /// Check the engine can run before any page is rendered. Returns a
    /// version or description string for logs.
    fn probe(&self) -> Result<String, RecognitionError> {
        Ok(self.name().to_string())
    }
}

/// Tesseract, run as an external program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
    language: String,
    page_segmentation_mode: Option<u8>,
}

impl TesseractCli {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
            page_segmentation_mode: None,
        }
    }

    pub fn with_page_segmentation_mode(mut self, psm: u8) -> Self {
        self.page_segmentation_mode = Some(psm);
        self
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        let engine = Self::new(&config.tesseract_program, &config.language);
        match config.page_segmentation_mode {
            Some(psm) => engine.with_page_segmentation_mode(psm),
            None => engine,
        }
    }

    /// Arguments for recognizing `image_path`, printing text to stdout.
    pub fn args(&self, image_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            image_path.as_os_str().to_owned(),
            "stdout".into(),
            "-l".into(),
            self.language.clone().into(),
        ];
        if let Some(psm) = self.page_segmentation_mode {
            args.push("--psm".into());
            args.push(psm.to_string().into());
        }
        args
    }

    fn unavailable(&self, e: std::io::Error) -> RecognitionError {
        let detail = match e.kind() {
            ErrorKind::NotFound => "program not found on PATH".to_string(),
            ErrorKind::PermissionDenied => "program is not executable".to_string(),
            _ => e.to_string(),
        };
        RecognitionError::EngineUnavailable {
            program: self.program.clone(),
            detail,
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, page: &PreprocessedImage) -> Result<String, RecognitionError> {
        let staged = tempfile::Builder::new()
            .prefix("pdf2txt-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| RecognitionError::Staging(e.to_string()))?;

        page.image
            .save_with_format(staged.path(), ImageFormat::Png)
            .map_err(|e| RecognitionError::Staging(e.to_string()))?;

        let output = Command::new(&self.program)
            .args(self.args(staged.path()))
            .output()
            .map_err(|e| self.unavailable(e))?;

        if !output.status.success() {
            return Err(RecognitionError::EngineFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "Page {}: tesseract returned {} chars",
            page.page_num,
            text.len()
        );
        Ok(text)
    }

    fn probe(&self) -> Result<String, RecognitionError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| self.unavailable(e))?;

        if !output.status.success() {
            return Err(RecognitionError::EngineUnavailable {
                program: self.program.clone(),
                detail: format!(
                    "'--version' exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // Tesseract 3.x printed its version on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let version = stdout
            .lines()
            .chain(stderr.lines())
            .find(|l| !l.trim().is_empty())
            .unwrap_or("unknown")
            .trim()
            .to_string();

        info!("OCR engine: {}", version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    const MISSING: &str = "pdf2txt-no-such-ocr-engine";

    #[test]
    fn args_include_language_and_psm() {
        let engine = TesseractCli::new("tesseract", "eng+deu").with_page_segmentation_mode(6);
        let args = engine.args(Path::new("/tmp/p.png"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/tmp/p.png", "stdout", "-l", "eng+deu", "--psm", "6"]);
    }

    #[test]
    fn from_config_carries_settings() {
        let config = ExtractionConfig::builder()
            .language("fra")
            .page_segmentation_mode(4)
            .tesseract_program("/opt/tess/bin/tesseract")
            .build()
            .unwrap();
        let engine = TesseractCli::from_config(&config);
        assert_eq!(engine.program, "/opt/tess/bin/tesseract");
        assert_eq!(engine.language, "fra");
        assert_eq!(engine.page_segmentation_mode, Some(4));
    }

    #[test]
    fn probe_reports_missing_engine() {
        let err = TesseractCli::new(MISSING, "eng").probe().unwrap_err();
        match err {
            RecognitionError::EngineUnavailable { program, .. } => assert_eq!(program, MISSING),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn recognize_reports_missing_engine() {
        let page = PreprocessedImage {
            page_num: 1,
            image: GrayImage::new(8, 8),
        };
        let err = TesseractCli::new(MISSING, "eng").recognize(&page).unwrap_err();
        assert!(matches!(err, RecognitionError::EngineUnavailable { .. }));
    }
}
