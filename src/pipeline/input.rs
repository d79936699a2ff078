//! Input validation: make sure the document path names a readable PDF.
//!
//! pdfium reports a missing file, a permission problem and a PNG renamed to
//! `.pdf` all as the same opaque load error. Checking up front lets the run
//! fail with a message that names the actual problem.

use crate::error::RenderError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate that `path` exists, is readable and starts with `%PDF`.
///
/// Returns the path unchanged on success so callers can chain it.
pub fn resolve_input(path: &Path) -> Result<PathBuf, RenderError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(RenderError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(RenderError::NotAPdf {
            path,
            magic: [0; 4],
        });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            // Files shorter than four bytes cannot be PDFs either.
            if f.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
                return Err(RenderError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(RenderError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(RenderError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_input(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, RenderError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("scan.pdf");
        std::fs::write(&p, b"\x89PNG\r\n").unwrap();
        match resolve_input(&p).unwrap_err() {
            RenderError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_and_directory_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tiny.pdf");
        std::fs::write(&p, b"%P").unwrap();
        assert!(matches!(resolve_input(&p), Err(RenderError::NotAPdf { .. })));
        assert!(matches!(
            resolve_input(dir.path()),
            Err(RenderError::NotAPdf { .. })
        ));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("doc.pdf");
        std::fs::write(&p, b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_input(&p).unwrap(), p);
    }
}
