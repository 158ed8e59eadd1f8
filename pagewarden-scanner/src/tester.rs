//! Per-page test runner.
//!
//! Each page is loaded once in a fresh tab. The DOM is captured a single
//! time and every enabled analyzer runs on that snapshot, one after another.

use crate::analyzer::{AnalyzerSet, Issue, PageSnapshot, TestCategory};
use crate::browser::{BrowserContext, PageDriver, WaitPolicy, bounded};
use crate::config::CrawlConfig;
use crate::crawler::ProgressCallback;
use crate::error::{Result, ScanError};
use crate::registry::CrawledPage;
use crate::result::{PageTestResult, SeverityCounts, category_score, url_to_filename};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

struct Evaluation {
    title: String,
    screenshot_path: Option<PathBuf>,
    findings: Vec<(TestCategory, Vec<Issue>)>,
}

pub struct PageTester<'a, C: BrowserContext> {
    context: &'a C,
    config: &'a CrawlConfig,
    analyzers: &'a AnalyzerSet,
    progress_callback: Option<ProgressCallback>,
}

impl<'a, C: BrowserContext> PageTester<'a, C> {
    pub fn new(context: &'a C, config: &'a CrawlConfig, analyzers: &'a AnalyzerSet) -> Self {
        Self {
            context,
            config,
            analyzers,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, message: String, current: usize, total: usize) {
        if let Some(ref callback) = self.progress_callback {
            callback(message, current, total);
        }
    }

    /// Test every page in order, pausing between pages like the crawl does.
    pub async fn test_all(&self, pages: &[CrawledPage]) -> Vec<PageTestResult> {
        let total = pages.len();
        self.report_progress(format!("Testing {} pages...", total), 0, total);

        let delay = self.config.request_delay();
        let mut results = Vec::with_capacity(total);

        for (i, page) in pages.iter().enumerate() {
            self.report_progress(format!("Testing: {}", page.url), i + 1, total);
            results.push(self.test_page(page).await);

            if !delay.is_zero() && i + 1 < total {
                tokio::time::sleep(delay).await;
            }
        }

        self.report_progress(
            format!("Testing complete: {} pages tested", total),
            total,
            total,
        );
        results
    }

    /// Never fails: problems end up in the result's `error`.
    pub async fn test_page(&self, page: &CrawledPage) -> PageTestResult {
        let started = Instant::now();
        let tested_at = Utc::now();

        let outcome = match self.context.new_page().await {
            Ok(mut tab) => {
                let outcome = self.evaluate(&mut tab, &page.url).await;
                if let Err(e) = tab.close().await {
                    debug!("Closing test page failed: {}", e);
                }
                outcome
            }
            Err(e) => Err(e),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(evaluation) => self.score(page, evaluation, tested_at, duration_ms),
            Err(e) => {
                warn!("Testing {} failed: {}", page.url, e);
                PageTestResult::failed(
                    page.url.clone(),
                    page.title.clone(),
                    tested_at,
                    duration_ms,
                    e.to_string(),
                )
            }
        }
    }

    async fn evaluate(&self, tab: &mut C::Page, url: &str) -> Result<Evaluation> {
        let navigation = self.config.timeouts.navigation();
        bounded(
            "navigation",
            navigation,
            tab.goto(url, WaitPolicy::NetworkIdle, navigation),
        )
        .await?;

        let title = tab.title().await?;

        let screenshot_path = if self.config.capture_screenshots {
            self.capture(tab, url).await
        } else {
            None
        };

        let snapshot = PageSnapshot {
            url: url.to_string(),
            title: title.clone(),
            html: tab.content().await?,
        };

        let mut findings = Vec::new();
        for category in TestCategory::SCORED {
            if !self.config.runs_category(category) {
                continue;
            }
            let mut issues = Vec::new();
            for analyzer in self.analyzers.for_category(category) {
                let found = analyzer.analyze(&snapshot).map_err(|e| ScanError::Analyzer {
                    analyzer: analyzer.name().to_string(),
                    message: e.to_string(),
                })?;
                debug!("{} found {} issues on {}", analyzer.name(), found.len(), url);
                issues.extend(found);
            }
            findings.push((category, issues));
        }

        Ok(Evaluation {
            title,
            screenshot_path,
            findings,
        })
    }

    async fn capture(&self, tab: &C::Page, url: &str) -> Option<PathBuf> {
        let directory = self.config.screenshot_directory();
        let path = directory.join(format!("{}.png", url_to_filename(url)));

        match save_screenshot(tab, &directory, &path).await {
            Ok(()) => Some(path),
            Err(ScanError::Unsupported(reason)) => {
                debug!("No screenshot for {}: {}", url, reason);
                None
            }
            Err(e) => {
                warn!("Screenshot of {} failed: {}", url, e);
                None
            }
        }
    }

    fn score(
        &self,
        page: &CrawledPage,
        evaluation: Evaluation,
        tested_at: chrono::DateTime<Utc>,
        duration_ms: u64,
    ) -> PageTestResult {
        let mut scores = [100.0; 3];
        let mut issues = Vec::new();

        for (category, found) in evaluation.findings {
            if let Some(slot) = TestCategory::SCORED.iter().position(|c| *c == category) {
                scores[slot] = category_score(category, found.len());
            }
            issues.extend(found);
        }

        // Categories that did not run hold 100, so every page is scored out of three.
        let overall_score = scores.iter().sum::<f64>() / scores.len() as f64;

        let severity_counts = SeverityCounts::tally(&issues);
        let passed = severity_counts.critical == 0 && severity_counts.serious == 0;
        info!(
            "Tested {}: {:.1} overall, {} issues",
            page.url,
            overall_score,
            issues.len()
        );

        PageTestResult {
            url: page.url.clone(),
            title: Some(evaluation.title),
            tested_at,
            duration_ms,
            screenshot_path: evaluation.screenshot_path,
            accessibility_score: scores[0],
            visual_score: scores[1],
            responsive_score: scores[2],
            overall_score,
            severity_counts,
            issues,
            passed,
            error: None,
        }
    }
}

async fn save_screenshot<P: PageDriver>(tab: &P, directory: &Path, path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(directory).await?;
    tab.screenshot(path).await
}
