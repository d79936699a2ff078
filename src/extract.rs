//! The per-page extraction loop.
//!
//! Pages arrive from the renderer one at a time and go through
//! preprocess → recognize → cleanup → write before the next one is pulled.
//! Preprocessing and OCR run together on a blocking thread; cleanup and the
//! write happen back on the async side.
//!
//! A failure on one page becomes a [`PageResult`] with `error` set and the
//! loop moves on. Nothing in here is fatal to the run. A file left for that
//! page by an earlier run is removed, so the page shows up as a gap.

use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::output::{ExtractionReport, ExtractionStats, PageResult};
use crate::pipeline::cleanup;
use crate::pipeline::preprocess::Preprocessor;
use crate::pipeline::recognize::TextRecognizer;
use crate::pipeline::render::{PageImage, RenderedDocument};
use crate::pipeline::write::PageWriter;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What one successful page produced.
struct PageOutcome {
    path: PathBuf,
    chars: usize,
    ocr_ms: u64,
}

/// Drain `document`, writing one text file per page through `writer`.
///
/// Always returns a report; per-page failures are inside it.
pub async fn extract_pages(
    mut document: RenderedDocument,
    recognizer: Arc<dyn TextRecognizer>,
    writer: &PageWriter,
    config: &ExtractionConfig,
) -> ExtractionReport {
    let start = Instant::now();
    let selected = document.selected_pages;
    let preprocessor = Preprocessor::from_config(config);
    let progress = config.progress_callback.as_ref();

    if selected == 0 {
        warn!("Page selection matched none of the {} pages", document.total_pages);
    }
    info!(
        "Extracting {} of {} pages with {} into {}",
        selected,
        document.total_pages,
        recognizer.name(),
        writer.dir().display()
    );
    if let Some(cb) = progress {
        cb.on_extraction_start(selected);
    }

    let mut pages = Vec::with_capacity(selected);
    let mut ocr_duration_ms = 0;

    while let Some(item) = document.pages.next().await {
        let page_start = Instant::now();
        let page_num = match &item {
            Ok(image) => image.page_num,
            Err(e) => e.page(),
        };
        if let Some(cb) = progress {
            cb.on_page_start(page_num, selected);
        }

        let outcome = match item {
            Ok(image) => process_page(image, &preprocessor, &recognizer, writer).await,
            Err(e) => Err(e),
        };
        let duration_ms = page_start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(PageOutcome { path, chars, ocr_ms }) => {
                ocr_duration_ms += ocr_ms;
                if let Some(cb) = progress {
                    cb.on_page_complete(page_num, selected, chars);
                }
                debug!("Page {} done in {}ms ({} chars)", page_num, duration_ms, chars);
                PageResult {
                    page_num,
                    path: Some(path),
                    chars,
                    duration_ms,
                    error: None,
                }
            }
            Err(e) => {
                warn!("{}", e);
                writer.discard(page_num).await;
                if let Some(cb) = progress {
                    cb.on_page_error(page_num, selected, &e.to_string());
                }
                PageResult::failed(page_num, duration_ms, e)
            }
        };
        pages.push(result);
    }

    let succeeded = pages.iter().filter(|p| p.is_ok()).count();
    let stats = ExtractionStats {
        total_pages: document.total_pages,
        attempted_pages: pages.len(),
        succeeded_pages: succeeded,
        failed_pages: pages.len() - succeeded,
        total_duration_ms: start.elapsed().as_millis() as u64,
        ocr_duration_ms,
    };

    info!(
        "Extraction complete: {}/{} pages, {}ms total",
        stats.succeeded_pages, stats.attempted_pages, stats.total_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_extraction_complete(selected, succeeded);
    }

    ExtractionReport { pages, stats }
}

async fn process_page(
    image: PageImage,
    preprocessor: &Preprocessor,
    recognizer: &Arc<dyn TextRecognizer>,
    writer: &PageWriter,
) -> Result<PageOutcome, PageError> {
    let page_num = image.page_num;
    let preprocessor = preprocessor.clone();
    let recognizer = Arc::clone(recognizer);

    let (raw, ocr_ms) = tokio::task::spawn_blocking(move || {
        let prepared = preprocessor
            .process(image)
            .map_err(|e| PageError::preprocess(page_num, e))?;
        let ocr_start = Instant::now();
        let text = recognizer
            .recognize(&prepared)
            .map_err(|e| PageError::recognition(page_num, e))?;
        Ok::<_, PageError>((text, ocr_start.elapsed().as_millis() as u64))
    })
    .await
    .map_err(|e| PageError::Panicked {
        page: page_num,
        detail: e.to_string(),
    })??;

    let text = cleanup::clean_text(&raw);
    let path = writer
        .write(page_num, &text)
        .await
        .map_err(|e| PageError::write(page_num, e))?;

    Ok(PageOutcome {
        path,
        chars: text.chars().count(),
        ocr_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecognitionError;
    use crate::pipeline::preprocess::PreprocessedImage;
    use image::{DynamicImage, Rgba, RgbaImage};

    struct PageNumberEcho;

    impl TextRecognizer for PageNumberEcho {
        fn name(&self) -> &str {
            "echo"
        }

        fn recognize(&self, page: &PreprocessedImage) -> Result<String, RecognitionError> {
            Ok(format!("text of page {}  \r\n\u{c}", page.page_num))
        }
    }

    struct Panics;

    impl TextRecognizer for Panics {
        fn name(&self) -> &str {
            "panics"
        }

        fn recognize(&self, _page: &PreprocessedImage) -> Result<String, RecognitionError> {
            panic!("engine exploded")
        }
    }

    fn page(n: usize) -> Result<PageImage, PageError> {
        Ok(PageImage {
            page_num: n,
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255; 4]))),
            dpi: 200,
        })
    }

    #[tokio::test]
    async fn writes_cleaned_text_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path(), 2);
        let doc = RenderedDocument::from_pages(2, vec![page(1), page(2)]);

        let report = extract_pages(
            doc,
            Arc::new(PageNumberEcho),
            &writer,
            &ExtractionConfig::default(),
        )
        .await;

        assert_eq!(report.stats.succeeded_pages, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("page_002.txt")).unwrap(),
            "text of page 2\n"
        );
        assert_eq!(report.pages[0].chars, "text of page 1\n".len());
    }

    #[tokio::test]
    async fn render_errors_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path(), 3);
        let broken = Err(PageError::Render {
            page: 2,
            detail: "bad stream".into(),
        });
        let doc = RenderedDocument::from_pages(3, vec![page(1), broken, page(3)]);

        let report = extract_pages(
            doc,
            Arc::new(PageNumberEcho),
            &writer,
            &ExtractionConfig::default(),
        )
        .await;

        assert_eq!(report.stats.attempted_pages, 3);
        assert_eq!(report.stats.failed_pages, 1);
        assert_eq!(report.failures().next().unwrap().stage(), "render");
        assert!(!dir.path().join("page_002.txt").exists());
        assert!(dir.path().join("page_003.txt").exists());
    }

    #[tokio::test]
    async fn failed_page_removes_file_from_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path(), 2);
        writer.write(2, "old text").await.unwrap();
        let broken = Err(PageError::Render {
            page: 2,
            detail: "bad stream".into(),
        });
        let doc = RenderedDocument::from_pages(2, vec![page(1), broken]);

        let report = extract_pages(
            doc,
            Arc::new(PageNumberEcho),
            &writer,
            &ExtractionConfig::default(),
        )
        .await;

        assert_eq!(report.stats.failed_pages, 1);
        assert!(dir.path().join("page_001.txt").exists());
        assert!(!dir.path().join("page_002.txt").exists());
    }

    #[tokio::test]
    async fn panicking_engine_becomes_page_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path(), 1);
        let doc = RenderedDocument::from_pages(1, vec![page(1)]);

        let report =
            extract_pages(doc, Arc::new(Panics), &writer, &ExtractionConfig::default()).await;

        assert!(matches!(
            report.pages[0].error,
            Some(PageError::Panicked { page: 1, .. })
        ));
    }
}
