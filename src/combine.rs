//! Combine per-page text files into one document.
//!
//! Pages are ordered by the number parsed from each file name, never by
//! directory listing order (which no filesystem guarantees).
//!
//! ## Gaps
//!
//! A gap in the page sequence (say `page_002.txt` is missing because OCR
//! failed on that page) does not stop the combine. Every run of missing numbers
//! is logged as a warning and listed in [`CombineReport::missing_pages`], and
//! the pages that do exist are combined in order. The same applies to a page
//! file that exists but cannot be read. Gaps are kept as ranges, so a stray
//! `page_99999999.txt` costs one warning, not millions.
//!
//! ## Duplicates
//!
//! `page_7.txt` and `page_0007.txt` both claim page 7, which happens when an
//! earlier run of a longer document used wider names. The most recently
//! modified file wins.

use crate::config::ExtractionConfig;
use crate::error::CombineError;
use crate::output::{CombineReport, PageRange};
use crate::pipeline::write::{parse_page_file_name, write_atomic};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Combine every `page_<N>.txt` in `output_dir` into
/// `output_dir/<config.combined_file_name>`.
///
/// # Errors
/// - [`CombineError::DirectoryMissing`] — `output_dir` does not exist
/// - [`CombineError::NoPageFiles`] — nothing to combine; no file is created
/// - [`CombineError::NothingReadable`] — page files exist but none could be read
/// - [`CombineError::WriteFailed`] — the combined document could not be written
pub async fn combine(
    output_dir: &Path,
    config: &ExtractionConfig,
) -> Result<CombineReport, CombineError> {
    combine_pages(output_dir, None, config).await
}

/// Like [`combine`], but pages after the last file up to `last_expected`
/// are reported missing too.
pub async fn combine_through(
    output_dir: &Path,
    last_expected: usize,
    config: &ExtractionConfig,
) -> Result<CombineReport, CombineError> {
    combine_pages(output_dir, Some(last_expected), config).await
}

async fn combine_pages(
    output_dir: &Path,
    last_expected: Option<usize>,
    config: &ExtractionConfig,
) -> Result<CombineReport, CombineError> {
    let is_dir = tokio::fs::metadata(output_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(CombineError::DirectoryMissing {
            path: output_dir.to_path_buf(),
        });
    }

    let files = discover_page_files(output_dir).await?;
    if files.is_empty() {
        return Err(CombineError::NoPageFiles {
            path: output_dir.to_path_buf(),
        });
    }
    info!(
        "Combining {} page files from {}",
        files.len(),
        output_dir.display()
    );

    let missing_pages = find_gaps(&files, last_expected);
    for gap in &missing_pages {
        if gap.first == gap.last {
            warn!("Page {} has no text file; combining without it", gap);
        } else {
            warn!("Pages {} have no text files; combining without them", gap);
        }
    }

    let mut pages_combined = Vec::with_capacity(files.len());
    let mut unreadable = Vec::new();
    let mut combined = String::new();

    for (page_num, path) in &files {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                unreadable.push(path.clone());
                continue;
            }
        };

        if !pages_combined.is_empty() {
            combined.push_str(&config.page_separator.render(*page_num));
        }
        combined.push_str(content.trim());
        pages_combined.push(*page_num);
    }

    if pages_combined.is_empty() {
        return Err(CombineError::NothingReadable {
            path: output_dir.to_path_buf(),
            count: files.len(),
        });
    }

    let combined_path = output_dir.join(&config.combined_file_name);
    write_atomic(&combined_path, combined.as_bytes())
        .await
        .map_err(|source| CombineError::WriteFailed {
            path: combined_path.clone(),
            source,
        })?;

    info!("Combined text saved to {}", combined_path.display());

    Ok(CombineReport {
        path: combined_path,
        pages_combined,
        missing_pages,
        unreadable,
        bytes_written: combined.len(),
    })
}

/// List page files in `dir`, sorted by page number.
///
/// When two names encode the same page (`page_7.txt` and `page_007.txt`) the
/// most recently modified one wins, then the narrower name. The other is
/// ignored with a warning.
pub async fn discover_page_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>, CombineError> {
    let list_failed = |source| CombineError::ListFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(list_failed)?;
    let mut files: Vec<PageFile> = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
        let name = entry.file_name();
        let Some(page_num) = name.to_str().and_then(parse_page_file_name) else {
            continue;
        };
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if metadata.is_file() {
            files.push(PageFile {
                page_num,
                path: entry.path(),
                modified: metadata.modified().ok(),
            });
        }
    }

    // Within a page: newest first, then the shortest name.
    files.sort_by(|a, b| {
        a.page_num
            .cmp(&b.page_num)
            .then_with(|| b.modified.cmp(&a.modified))
            .then_with(|| a.name_len().cmp(&b.name_len()))
            .then_with(|| a.path.cmp(&b.path))
    });
    files.dedup_by(|later, kept| {
        let duplicate = later.page_num == kept.page_num;
        if duplicate {
            warn!(
                "Ignoring {}: page {} is taken from newer {}",
                later.path.display(),
                kept.page_num,
                kept.path.display()
            );
        }
        duplicate
    });

    debug!("Discovered {} page files in {}", files.len(), dir.display());
    Ok(files.into_iter().map(|f| (f.page_num, f.path)).collect())
}

struct PageFile {
    page_num: usize,
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl PageFile {
    fn name_len(&self) -> usize {
        self.path.file_name().map_or(0, |n| n.len())
    }
}

/// Runs of page numbers in `1..=max` that have no file, where `max` is the
/// larger of the last file and `last_expected`. `files` must be sorted.
fn find_gaps(files: &[(usize, PathBuf)], last_expected: Option<usize>) -> Vec<PageRange> {
    let mut gaps = Vec::new();
    let mut expected = 1;
    for (page_num, _) in files {
        if *page_num > expected {
            gaps.push(PageRange::new(expected, page_num - 1));
        }
        expected = page_num.saturating_add(1);
    }
    if let Some(last) = last_expected {
        if last >= expected {
            gaps.push(PageRange::new(expected, last));
        }
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pages: &[usize]) -> Vec<(usize, PathBuf)> {
        pages
            .iter()
            .map(|&p| (p, PathBuf::from(format!("page_{p:03}.txt"))))
            .collect()
    }

    #[test]
    fn gaps_are_found_at_start_and_middle() {
        assert_eq!(find_gaps(&entries(&[1, 2, 3]), None), Vec::<PageRange>::new());
        assert_eq!(find_gaps(&entries(&[1, 3]), None), vec![PageRange::single(2)]);
        assert_eq!(
            find_gaps(&entries(&[3, 4, 7]), None),
            vec![PageRange::new(1, 2), PageRange::new(5, 6)]
        );
    }

    #[test]
    fn trailing_gap_needs_an_expected_last_page() {
        assert_eq!(find_gaps(&entries(&[1, 2]), Some(2)), Vec::<PageRange>::new());
        assert_eq!(find_gaps(&entries(&[1, 2]), Some(3)), vec![PageRange::single(3)]);
        assert_eq!(
            find_gaps(&entries(&[2]), Some(5)),
            vec![PageRange::single(1), PageRange::new(3, 5)]
        );
        // Files beyond the expected range still count.
        assert_eq!(find_gaps(&entries(&[1, 4]), Some(2)), vec![PageRange::new(2, 3)]);
    }

    #[test]
    fn huge_page_number_is_one_gap() {
        let files = vec![
            (1, PathBuf::from("page_001.txt")),
            (usize::MAX, PathBuf::from("page_huge.txt")),
        ];
        assert_eq!(
            find_gaps(&files, None),
            vec![PageRange::new(2, usize::MAX - 1)]
        );
    }

    #[tokio::test]
    async fn stray_huge_page_file_is_combined_without_blowup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page_001.txt"), "one").unwrap();
        std::fs::write(dir.path().join("page_99999999999999999.txt"), "stray").unwrap();

        let report = combine(dir.path(), &ExtractionConfig::default()).await.unwrap();
        assert_eq!(report.pages_combined, vec![1, 99_999_999_999_999_999]);
        assert_eq!(
            report.missing_pages,
            vec![PageRange::new(2, 99_999_999_999_999_998)]
        );
    }

    #[tokio::test]
    async fn newest_duplicate_wins_over_stale_wider_name() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("page_0001.txt");
        std::fs::write(&stale, "STALE").unwrap();
        let old = SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(old)
            .unwrap();
        std::fs::write(dir.path().join("page_001.txt"), "FRESH1").unwrap();
        std::fs::write(dir.path().join("page_002.txt"), "FRESH2").unwrap();

        let report = combine(dir.path(), &ExtractionConfig::default()).await.unwrap();
        let combined = std::fs::read_to_string(&report.path).unwrap();
        assert!(combined.starts_with("FRESH1\n"), "got: {combined:?}");
        assert!(!combined.contains("STALE"));
        assert_eq!(report.pages_combined, vec![1, 2]);
    }

    #[tokio::test]
    async fn discovery_ignores_other_files_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "page_010.txt",
            "page_2.txt",
            "page_002.txt",
            "combined_text.txt",
            "notes.md",
            "page_003.txt.tmp",
        ] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(dir.path().join("page_004.txt")).unwrap();
        // Left over from an earlier run.
        std::fs::File::options()
            .write(true)
            .open(dir.path().join("page_2.txt"))
            .unwrap()
            .set_modified(SystemTime::now() - std::time::Duration::from_secs(60))
            .unwrap();

        let files = discover_page_files(dir.path()).await.unwrap();
        let found: Vec<(usize, String)> = files
            .iter()
            .map(|(n, p)| (*n, p.file_name().unwrap().to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            found,
            vec![(2, "page_002.txt".to_string()), (10, "page_010.txt".to_string())]
        );
    }

    #[tokio::test]
    async fn equal_mtimes_prefer_the_narrower_name() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = SystemTime::now();
        for name in ["page_0005.txt", "page_005.txt"] {
            let path = dir.path().join(name);
            std::fs::write(&path, name).unwrap();
            std::fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
        }

        let files = discover_page_files(dir.path()).await.unwrap();
        assert_eq!(files, vec![(5, dir.path().join("page_005.txt"))]);
    }
}
