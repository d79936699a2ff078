//! Run orchestration: validate, extract, optionally combine, report.
//!
//! A run walks a small state machine:
//!
//! ```text
//! Idle ──▶ Extracting ──▶ (Combining) ──▶ Done
//! Idle ──────────────────▶ Combining  ──▶ Done
//! ```
//!
//! Everything that can make the whole run pointless is checked in `Idle`,
//! before the first page is rendered: the document, the output directory and
//! the OCR engine. From `Extracting` on, failures are recorded in the
//! [`RunSummary`] instead of aborting the run.

use crate::combine::{combine, combine_through};
use crate::config::ExtractionConfig;
use crate::error::{CombineError, Pdf2TxtError};
use crate::extract::extract_pages;
use crate::output::{CombineStatus, RunSummary};
use crate::pipeline::input::resolve_input;
use crate::pipeline::recognize::{TesseractCli, TextRecognizer};
use crate::pipeline::render::{render_pages, RenderedDocument};
use crate::pipeline::write::{prepare_output_dir, PageWriter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a run should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// OCR the document, then combine the page files if `combine` is set.
    Extract { combine: bool },
    /// Combine existing page files only.
    CombineOnly,
}

/// Inputs for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Source document. Required for [`Mode::Extract`], ignored otherwise.
    pub pdf_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub mode: Mode,
}

impl RunRequest {
    pub fn extract(pdf_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_path: Some(pdf_path.into()),
            output_dir: output_dir.into(),
            mode: Mode::Extract { combine: false },
        }
    }

    pub fn combine_only(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_path: None,
            output_dir: output_dir.into(),
            mode: Mode::CombineOnly,
        }
    }

    /// Combine after extraction. No effect on [`Mode::CombineOnly`].
    pub fn with_combine(mut self, combine: bool) -> Self {
        if let Mode::Extract { .. } = self.mode {
            self.mode = Mode::Extract { combine };
        }
        self
    }
}

/// Driver states, logged at debug level as a run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    Combining,
    Done,
}

struct StageTracker(Stage);

impl StageTracker {
    fn enter(&mut self, next: Stage) {
        debug!("Driver: {:?} → {:?}", self.0, next);
        self.0 = next;
    }
}

/// Run with the Tesseract engine configured in `config`.
///
/// # Errors
/// Only conditions that stop the run: invalid mode, unusable document,
/// unwritable output directory, missing OCR engine, or a failed combine in
/// combine-only mode. Page failures and a failed combine after extraction
/// are reported in the returned [`RunSummary`].
pub async fn run(request: &RunRequest, config: &ExtractionConfig) -> Result<RunSummary, Pdf2TxtError> {
    let engine: Arc<dyn TextRecognizer> = Arc::new(TesseractCli::from_config(config));
    run_with(request, engine, config).await
}

/// Run with a caller-supplied recognizer.
pub async fn run_with(
    request: &RunRequest,
    recognizer: Arc<dyn TextRecognizer>,
    config: &ExtractionConfig,
) -> Result<RunSummary, Pdf2TxtError> {
    let mut stage = StageTracker(Stage::Idle);
    let output_dir = &request.output_dir;

    let combine_requested = match request.mode {
        Mode::CombineOnly => {
            if let Some(ref path) = request.pdf_path {
                warn!(
                    "Skipping extraction; ignoring document {}",
                    path.display()
                );
            }
            if !output_dir.is_dir() {
                return Err(CombineError::DirectoryMissing {
                    path: output_dir.clone(),
                }
                .into());
            }

            stage.enter(Stage::Combining);
            let report = combine(output_dir, config).await?;
            stage.enter(Stage::Done);
            return Ok(RunSummary {
                extraction: None,
                combine: Some(CombineStatus::Combined(report)),
            });
        }
        Mode::Extract { combine } => combine,
    };

    let pdf_path = request.pdf_path.as_deref().ok_or_else(|| {
        Pdf2TxtError::InvalidMode("extraction requires a PDF path".to_string())
    })?;

    let pdf_path = resolve_input(pdf_path)?;
    prepare_output_dir(output_dir).await?;
    check_engine(&recognizer).await?;

    stage.enter(Stage::Extracting);
    info!(
        "Extracting {} into {}",
        pdf_path.display(),
        output_dir.display()
    );
    let document = render_pages(&pdf_path, config).await?;
    let summary = extract_then_combine(
        document,
        output_dir,
        combine_requested,
        recognizer,
        config,
        stage,
    )
    .await;
    Ok(summary)
}

/// Run the extraction half on pages that are already available, e.g. images
/// rendered by some other tool.
///
/// The output directory and the engine are checked first, as in [`run_with`].
pub async fn run_document(
    document: RenderedDocument,
    output_dir: &Path,
    combine: bool,
    recognizer: Arc<dyn TextRecognizer>,
    config: &ExtractionConfig,
) -> Result<RunSummary, Pdf2TxtError> {
    let stage = StageTracker(Stage::Idle);
    prepare_output_dir(output_dir).await?;
    check_engine(&recognizer).await?;
    let summary =
        extract_then_combine(document, output_dir, combine, recognizer, config, stage).await;
    Ok(summary)
}

async fn check_engine(recognizer: &Arc<dyn TextRecognizer>) -> Result<(), Pdf2TxtError> {
    let engine = Arc::clone(recognizer);
    let version = tokio::task::spawn_blocking(move || engine.probe())
        .await
        .map_err(|e| Pdf2TxtError::Internal(format!("engine probe panicked: {e}")))??;
    debug!("Recognizer ready: {}", version);
    Ok(())
}

async fn extract_then_combine(
    document: RenderedDocument,
    output_dir: &Path,
    combine_requested: bool,
    recognizer: Arc<dyn TextRecognizer>,
    config: &ExtractionConfig,
    mut stage: StageTracker,
) -> RunSummary {
    if stage.0 != Stage::Extracting {
        stage.enter(Stage::Extracting);
    }
    let writer = PageWriter::new(output_dir, document.total_pages);
    let report = extract_pages(document, recognizer, &writer, config).await;

    let combine_status = if combine_requested {
        stage.enter(Stage::Combining);
        // Pages that failed at the end of the selection are gaps too.
        let last_attempted = report.pages.iter().map(|p| p.page_num).max();
        let combined = match last_attempted {
            Some(last) => combine_through(output_dir, last, config).await,
            None => combine(output_dir, config).await,
        };
        Some(match combined {
            Ok(r) => CombineStatus::Combined(r),
            Err(e) => {
                error!("Combine failed: {}", e);
                CombineStatus::Failed {
                    reason: e.to_string(),
                }
            }
        })
    } else {
        None
    };

    stage.enter(Stage::Done);
    RunSummary {
        extraction: Some(report),
        combine: combine_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_combine_only_affects_extraction() {
        let r = RunRequest::extract("a.pdf", "out").with_combine(true);
        assert_eq!(r.mode, Mode::Extract { combine: true });
        let r = RunRequest::combine_only("out").with_combine(false);
        assert_eq!(r.mode, Mode::CombineOnly);
    }

    #[tokio::test]
    async fn extraction_without_path_is_invalid_mode() {
        let dir = tempfile::tempdir().unwrap();
        let request = RunRequest {
            pdf_path: None,
            output_dir: dir.path().to_path_buf(),
            mode: Mode::Extract { combine: true },
        };
        let err = run(&request, &ExtractionConfig::default()).await.unwrap_err();
        assert!(matches!(err, Pdf2TxtError::InvalidMode(_)));
    }

    #[tokio::test]
    async fn combine_only_missing_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let request = RunRequest::combine_only(dir.path().join("absent"));
        let err = run(&request, &ExtractionConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            Pdf2TxtError::Combine(CombineError::DirectoryMissing { .. })
        ));
    }

    #[tokio::test]
    async fn missing_document_fails_before_engine_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::builder()
            .tesseract_program("pdf2txt-no-such-ocr-engine")
            .build()
            .unwrap();
        let request = RunRequest::extract(dir.path().join("missing.pdf"), dir.path().join("out"));
        let err = run(&request, &config).await.unwrap_err();
        assert!(matches!(err, Pdf2TxtError::Render(_)), "got {err:?}");
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn missing_engine_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();
        let config = ExtractionConfig::builder()
            .tesseract_program("pdf2txt-no-such-ocr-engine")
            .build()
            .unwrap();
        let request = RunRequest::extract(&pdf, dir.path().join("out"));
        let err = run(&request, &config).await.unwrap_err();
        assert!(matches!(
            err,
            Pdf2TxtError::Recognition(crate::error::RecognitionError::EngineUnavailable { .. })
        ));
    }
}
