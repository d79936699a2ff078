//! Page files: naming, discovery and atomic writes.
//!
//! Page `n` of an `N`-page document is written to `page_<n>.txt`, where `<n>`
//! is zero-padded to at least three digits and to the width of `N`. Within one
//! run a plain lexicographic `ls` therefore lists pages in order. The combiner
//! does not rely on that and parses the number back out.

use crate::error::WriteError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MIN_PAGE_DIGITS: usize = 3;

static RE_PAGE_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^page_(\d+)\.txt$").unwrap());

/// Digits used for page numbers in an `total_pages`-page document.
pub fn page_number_width(total_pages: usize) -> usize {
    total_pages.to_string().len().max(MIN_PAGE_DIGITS)
}

/// File name for `page_num` (1-based) of a `total_pages`-page document.
pub fn page_file_name(page_num: usize, total_pages: usize) -> String {
    format!(
        "page_{:0width$}.txt",
        page_num,
        width = page_number_width(total_pages)
    )
}

/// Page number encoded in a page file name, or `None` for any other file.
pub fn parse_page_file_name(name: &str) -> Option<usize> {
    let caps = RE_PAGE_FILE.captures(name)?;
    caps[1].parse::<usize>().ok().filter(|&n| n >= 1)
}

/// Create `dir` if needed and check that files can be created in it.
pub async fn prepare_output_dir(dir: &Path) -> Result<(), WriteError> {
    let unwritable = |source| WriteError::DirectoryUnwritable {
        path: dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(unwritable)?;

    let probe = dir.join(".pdf2txt-write-probe");
    tokio::fs::write(&probe, b"").await.map_err(unwritable)?;
    tokio::fs::remove_file(&probe).await.map_err(unwritable)?;

    debug!("Output directory ready: {}", dir.display());
    Ok(())
}

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never see a half-written file.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("txt.tmp");
    if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Writes page text into one output directory.
#[derive(Debug, Clone)]
pub struct PageWriter {
    dir: PathBuf,
    total_pages: usize,
}

impl PageWriter {
    /// `dir` should already have been through [`prepare_output_dir`].
    pub fn new(dir: impl Into<PathBuf>, total_pages: usize) -> Self {
        Self {
            dir: dir.into(),
            total_pages,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, page_num: usize) -> PathBuf {
        self.dir.join(page_file_name(page_num, self.total_pages))
    }

    /// Write one page, replacing any previous file for the same page.
    pub async fn write(&self, page_num: usize, text: &str) -> Result<PathBuf, WriteError> {
        let path = self.path_for(page_num);
        write_atomic(&path, text.as_bytes())
            .await
            .map_err(|source| WriteError::FileWriteFailed {
                path: path.clone(),
                source,
            })?;
        debug!("Saved page {} to {}", page_num, path.display());
        Ok(path)
    }

    /// Remove the file a previous run left for `page_num`, so a page that
    /// failed this time is not combined from stale text.
    pub async fn discard(&self, page_num: usize) {
        let path = self.path_for(page_num);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => warn!("Removed stale {} after page {} failed", path.display(), page_num),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_zero_padded_to_document_width() {
        assert_eq!(page_file_name(1, 12), "page_001.txt");
        assert_eq!(page_file_name(42, 999), "page_042.txt");
        assert_eq!(page_file_name(7, 1500), "page_0007.txt");
    }

    #[test]
    fn lexicographic_order_is_page_order() {
        let total = 1234;
        let mut names: Vec<String> = (1..=total).map(|p| page_file_name(p, total)).collect();
        let expected = names.clone();
        names.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn parse_round_trips_and_rejects_others() {
        assert_eq!(parse_page_file_name("page_001.txt"), Some(1));
        assert_eq!(parse_page_file_name("page_12.txt"), Some(12));
        assert_eq!(parse_page_file_name("page_0000.txt"), None);
        assert_eq!(parse_page_file_name("page_001.txt.tmp"), None);
        assert_eq!(parse_page_file_name("combined_text.txt"), None);
        assert_eq!(parse_page_file_name("page_abc.txt"), None);
    }

    #[tokio::test]
    async fn write_creates_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        prepare_output_dir(&out).await.unwrap();

        let writer = PageWriter::new(&out, 3);
        let path = writer.write(2, "first").await.unwrap();
        assert_eq!(path, out.join("page_002.txt"));
        writer.write(2, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["page_002.txt".to_string()]);
    }

    #[tokio::test]
    async fn discard_removes_only_that_page() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path(), 3);
        writer.write(1, "one").await.unwrap();
        writer.write(2, "two").await.unwrap();

        writer.discard(2).await;
        // Nothing to remove is fine.
        writer.discard(3).await;

        assert!(dir.path().join("page_001.txt").exists());
        assert!(!dir.path().join("page_002.txt").exists());
    }

    #[tokio::test]
    async fn prepare_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let err = prepare_output_dir(&file).await.unwrap_err();
        assert!(matches!(err, WriteError::DirectoryUnwritable { .. }));
    }
}
