//! Result types produced by extraction, combination and full runs.
//!
//! All types derive `Serialize` so the CLI's `--json` mode can print them
//! verbatim.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Outcome of processing one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page number.
    pub page_num: usize,
    /// Page text file, set when the page was written.
    pub path: Option<PathBuf>,
    /// Characters of recognized text (after cleanup).
    pub chars: usize,
    /// Wall-clock time for preprocess + OCR + write.
    pub duration_ms: u64,
    /// Set when the page was skipped.
    pub error: Option<PageError>,
}

impl PageResult {
    pub(crate) fn failed(page_num: usize, duration_ms: u64, error: PageError) -> Self {
        Self {
            page_num,
            path: None,
            chars: 0,
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate timings and counts for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages selected and attempted.
    pub attempted_pages: usize,
    pub succeeded_pages: usize,
    pub failed_pages: usize,
    pub total_duration_ms: u64,
    /// Time spent inside the OCR engine.
    pub ocr_duration_ms: u64,
}

/// Everything one extraction produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Per-page outcomes in page order.
    pub pages: Vec<PageResult>,
    pub stats: ExtractionStats,
}

impl ExtractionReport {
    /// Page-level failures, in page order.
    pub fn failures(&self) -> impl Iterator<Item = &PageError> {
        self.pages.iter().filter_map(|p| p.error.as_ref())
    }

    /// Page files written, in page order.
    pub fn written_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.pages.iter().filter_map(|p| p.path.as_ref())
    }
}

/// An inclusive run of page numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn single(page: usize) -> Self {
        Self::new(page, page)
    }

    /// Number of pages in the range.
    pub fn page_count(&self) -> usize {
        self.last - self.first + 1
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// What the combiner did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombineReport {
    /// The combined document.
    pub path: PathBuf,
    /// Page numbers concatenated, ascending.
    pub pages_combined: Vec<usize>,
    /// Runs of page numbers with no file, ascending. Covers `1..=max` of the
    /// pages found, or of the expected last page when one was given.
    pub missing_pages: Vec<PageRange>,
    /// Page files that were found but could not be read.
    pub unreadable: Vec<PathBuf>,
    pub bytes_written: usize,
}

impl CombineReport {
    /// Total number of missing pages across all gaps.
    pub fn missing_count(&self) -> usize {
        self.missing_pages
            .iter()
            .fold(0, |n, r| n.saturating_add(r.page_count()))
    }
}

/// Result of the optional combine step inside a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CombineStatus {
    Combined(CombineReport),
    Failed { reason: String },
}

/// Final report of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Present when extraction ran.
    pub extraction: Option<ExtractionReport>,
    /// Present when combination was requested.
    pub combine: Option<CombineStatus>,
}

impl RunSummary {
    /// False when a requested combine step failed. Page-level failures do not
    /// make a run unsuccessful.
    pub fn is_success(&self) -> bool {
        !matches!(self.combine, Some(CombineStatus::Failed { .. }))
    }

    pub fn combine_ran(&self) -> bool {
        self.combine.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExtractionReport {
        ExtractionReport {
            pages: vec![
                PageResult {
                    page_num: 1,
                    path: Some(PathBuf::from("out/page_001.txt")),
                    chars: 12,
                    duration_ms: 5,
                    error: None,
                },
                PageResult::failed(
                    2,
                    3,
                    PageError::Recognition {
                        page: 2,
                        detail: "boom".into(),
                    },
                ),
            ],
            stats: ExtractionStats::default(),
        }
    }

    #[test]
    fn failures_and_paths_are_split() {
        let r = report();
        assert_eq!(r.failures().count(), 1);
        assert_eq!(r.failures().next().unwrap().page(), 2);
        assert_eq!(
            r.written_paths().collect::<Vec<_>>(),
            vec![&PathBuf::from("out/page_001.txt")]
        );
    }

    #[test]
    fn page_ranges_display_and_count() {
        assert_eq!(PageRange::single(4).to_string(), "4");
        assert_eq!(PageRange::new(2, 9).to_string(), "2-9");
        let big = PageRange::new(2, usize::MAX - 1);
        assert_eq!(big.page_count(), usize::MAX - 2);

        let report = CombineReport {
            path: PathBuf::from("out/combined_text.txt"),
            pages_combined: vec![1, 3, usize::MAX],
            missing_pages: vec![PageRange::single(2), big],
            unreadable: vec![],
            bytes_written: 0,
        };
        assert_eq!(report.missing_count(), usize::MAX - 1);
    }

    #[test]
    fn page_failures_do_not_fail_the_run() {
        let s = RunSummary {
            extraction: Some(report()),
            combine: None,
        };
        assert!(s.is_success());
        assert!(!s.combine_ran());
    }

    #[test]
    fn failed_combine_fails_the_run() {
        let s = RunSummary {
            extraction: None,
            combine: Some(CombineStatus::Failed {
                reason: "no files".into(),
            }),
        };
        assert!(!s.is_success());
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains(r#""status":"failed""#), "got: {json}");
    }
}
