use crate::analyzer::{Issue, Severity, TestCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::PathBuf;

const FILENAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub serious: usize,
    pub moderate: usize,
    pub minor: usize,
}

impl SeverityCounts {
    pub fn tally(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Serious => counts.serious += 1,
                Severity::Moderate => counts.moderate += 1,
                Severity::Minor => counts.minor += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.critical + self.serious + self.moderate + self.minor
    }
}

impl AddAssign for SeverityCounts {
    fn add_assign(&mut self, other: Self) {
        self.critical += other.critical;
        self.serious += other.serious;
        self.moderate += other.moderate;
        self.minor += other.minor;
    }
}

/// Outcome of testing one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageTestResult {
    pub url: String,
    pub title: Option<String>,
    pub tested_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub screenshot_path: Option<PathBuf>,
    pub accessibility_score: f64,
    pub visual_score: f64,
    pub responsive_score: f64,
    pub overall_score: f64,
    pub severity_counts: SeverityCounts,
    pub issues: Vec<Issue>,
    pub passed: bool,
    pub error: Option<String>,
}

impl PageTestResult {
    /// A result for a page whose test did not complete.
    pub fn failed(
        url: String,
        title: Option<String>,
        tested_at: DateTime<Utc>,
        duration_ms: u64,
        error: String,
    ) -> Self {
        Self {
            url,
            title,
            tested_at,
            duration_ms,
            screenshot_path: None,
            accessibility_score: 0.0,
            visual_score: 0.0,
            responsive_score: 0.0,
            overall_score: 0.0,
            severity_counts: SeverityCounts::default(),
            issues: Vec::new(),
            passed: false,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn score(&self, category: TestCategory) -> f64 {
        match category {
            TestCategory::Accessibility => self.accessibility_score,
            TestCategory::Visual => self.visual_score,
            TestCategory::Responsive => self.responsive_score,
            TestCategory::All => self.overall_score,
        }
    }
}

/// `100 - issues * penalty`, floored at zero.
pub fn category_score(category: TestCategory, issue_count: usize) -> f64 {
    (100.0 - issue_count as f64 * category.penalty()).max(0.0)
}

/// Filesystem-safe name derived from a page URL.
pub fn url_to_filename(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    stripped
        .chars()
        .map(|c| match c {
            '/' | ':' | '?' | '&' | '=' | '#' | '\\' => '_',
            c => c,
        })
        .take(FILENAME_LEN)
        .collect()
}
