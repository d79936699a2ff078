//! PDF rasterisation: stream selected pages as `DynamicImage`s via pdfium.
//!
//! ## Why a channel instead of a `Vec`?
//!
//! A 300-page scan at 200 DPI is several gigabytes of RGBA. Rendering runs on a
//! dedicated blocking thread and hands pages over a channel of capacity one,
//! so at most one rendered page waits while the previous page is in OCR. The
//! consumer sees an ordinary `Stream`; dropping it stops the renderer at the
//! next page boundary.
//!
//! pdfium uses thread-local state internally, so the document is opened,
//! rendered and closed on that single thread.

use crate::config::{ExtractionConfig, PageSelection};
use crate::error::{PageError, RenderError};
use futures::Stream;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// PDF user space is defined at 72 points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rendered page, owned by the pipeline until OCR is done with it.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number in document order.
    pub page_num: usize,
    pub image: DynamicImage,
    /// Resolution the page was rendered at.
    pub dpi: u32,
}

/// A boxed stream of rendered pages, ascending page order.
pub type PageStream = Pin<Box<dyn Stream<Item = Result<PageImage, PageError>> + Send>>;

/// An opened document whose pages are rendered on demand.
pub struct RenderedDocument {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages the stream will yield (after [`PageSelection`]).
    pub selected_pages: usize,
    pub pages: PageStream,
}

impl RenderedDocument {
    /// Wrap already-rendered pages, e.g. images loaded from disk.
    pub fn from_pages(total_pages: usize, pages: Vec<Result<PageImage, PageError>>) -> Self {
        let selected_pages = pages.len();
        Self {
            total_pages,
            selected_pages,
            pages: Box::pin(futures::stream::iter(pages)),
        }
    }
}

/// Open `pdf_path` and start rendering the selected pages.
///
/// Returns once the document is open: every document-level failure (binding,
/// corrupt file, password) is reported here as [`RenderError`]. Failures on
/// individual pages arrive later as `Err(PageError::Render)` stream items.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractionConfig,
) -> Result<RenderedDocument, RenderError> {
    let job = RenderJob {
        path: pdf_path.to_path_buf(),
        dpi: config.dpi,
        max_pixels: config.max_rendered_pixels,
        password: config.password.clone(),
        selection: config.pages.clone(),
    };

    let (ready_tx, ready_rx) = oneshot::channel();
    let (page_tx, page_rx) = mpsc::channel(1);

    tokio::task::spawn_blocking(move || job.run(ready_tx, page_tx));

    let (total_pages, selected_pages) = ready_rx.await.map_err(|_| {
        RenderError::WorkerFailed("renderer exited before opening the document".into())
    })??;

    Ok(RenderedDocument {
        total_pages,
        selected_pages,
        pages: Box::pin(ReceiverStream::new(page_rx)),
    })
}

/// Bind to a pdfium shared library.
///
/// Lookup order: `PDFIUM_LIB_PATH` (a library file or the directory holding
/// it), then the current directory, then the system loader path.
pub fn bind_pdfium() -> Result<Pdfium, RenderError> {
    if let Ok(configured) = std::env::var("PDFIUM_LIB_PATH") {
        let configured = PathBuf::from(configured);
        let lib = if configured.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&configured)
        } else {
            configured
        };
        debug!("Binding pdfium from PDFIUM_LIB_PATH: {}", lib.display());
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| RenderError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| RenderError::PdfiumBindingFailed(format!("{:?}", e)))
}

struct RenderJob {
    path: PathBuf,
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
    selection: PageSelection,
}

impl RenderJob {
    /// Blocking body of the render thread.
    fn run(
        self,
        ready: oneshot::Sender<Result<(usize, usize), RenderError>>,
        pages_tx: mpsc::Sender<Result<PageImage, PageError>>,
    ) {
        let pdfium = match bind_pdfium() {
            Ok(p) => p,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        let document = match pdfium.load_pdf_from_file(&self.path, self.password.as_deref()) {
            Ok(doc) => doc,
            Err(e) => {
                let _ = ready.send(Err(self.load_error(e)));
                return;
            }
        };

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        let indices = self.selection.to_indices(total_pages);
        info!(
            "PDF loaded: {} pages, {} selected",
            total_pages,
            indices.len()
        );

        if ready.send(Ok((total_pages, indices.len()))).is_err() {
            return;
        }

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / POINTS_PER_INCH)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        for idx in indices {
            let item = self.render_one(pages, idx, &render_config);
            if let Err(ref e) = item {
                warn!("{}", e);
            }
            if pages_tx.blocking_send(item).is_err() {
                debug!("Page consumer dropped; stopping renderer at page {}", idx + 1);
                break;
            }
        }
    }

    fn render_one(
        &self,
        pages: &PdfPages<'_>,
        idx: usize,
        render_config: &PdfRenderConfig,
    ) -> Result<PageImage, PageError> {
        let page_num = idx + 1;
        let page = pages
            .get(idx as u16)
            .map_err(|e| PageError::Render {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let bitmap = page
            .render_with_config(render_config)
            .map_err(|e| PageError::Render {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );

        Ok(PageImage {
            page_num,
            image,
            dpi: self.dpi,
        })
    }

    fn load_error(&self, e: PdfiumError) -> RenderError {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if self.password.is_some() {
                RenderError::WrongPassword {
                    path: self.path.clone(),
                }
            } else {
                RenderError::PasswordRequired {
                    path: self.path.clone(),
                }
            }
        } else {
            RenderError::CorruptPdf {
                path: self.path.clone(),
                detail: err_str,
            }
        }
    }
}
