// Site report aggregation and rendering

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pagewarden_scanner::{
    CrawlConfig, CrawledPage, PageTestResult, SeverityCounts, StatusCounts, TestCategory,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const JSON_REPORT_FILE: &str = "crawl_report.json";
pub const MARKDOWN_REPORT_FILE: &str = "crawl_report.md";

const WORST_PAGES: usize = 5;
const COMMON_ISSUES: usize = 10;
const BAR: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// An issue seen on one or more pages, identified by type and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCrawlReport {
    pub start_url: String,
    pub crawl_started: DateTime<Utc>,
    pub crawl_completed: DateTime<Utc>,
    pub total_duration_ms: u64,
    pub pages_discovered: usize,
    pub pages_tested: usize,
    pub pages_skipped: usize,
    pub pages_errored: usize,
    pub pages_pending: usize,
    pub average_accessibility_score: f64,
    pub average_visual_score: f64,
    pub average_responsive_score: f64,
    pub average_overall_score: f64,
    pub severity_totals: SeverityCounts,
    pub page_results: Vec<PageTestResult>,
    /// Lowest scoring URLs first.
    pub worst_pages: Vec<String>,
    pub common_issues: Vec<CommonIssue>,
    pub config: CrawlConfig,
    pub pages: Vec<CrawledPage>,
}

impl SiteCrawlReport {
    pub fn has_critical(&self) -> bool {
        self.severity_totals.critical > 0
    }

    pub fn result_for(&self, url: &str) -> Option<&PageTestResult> {
        self.page_results.iter().find(|r| r.url == url)
    }

    pub fn average_score(&self, category: TestCategory) -> f64 {
        match category {
            TestCategory::Accessibility => self.average_accessibility_score,
            TestCategory::Visual => self.average_visual_score,
            TestCategory::Responsive => self.average_responsive_score,
            TestCategory::All => self.average_overall_score,
        }
    }
}

/// Fold a finished crawl and its test results into one report.
///
/// Results carrying an error are left out of the averages and the
/// worst-page ranking but still appear in `page_results`.
pub fn aggregate(
    config: &CrawlConfig,
    pages: Vec<CrawledPage>,
    page_results: Vec<PageTestResult>,
    crawl_started: DateTime<Utc>,
    crawl_completed: DateTime<Utc>,
) -> SiteCrawlReport {
    let counts = StatusCounts::tally(&pages);
    let scored: Vec<&PageTestResult> = page_results.iter().filter(|r| !r.is_error()).collect();

    let mut severity_totals = SeverityCounts::default();
    for result in &scored {
        severity_totals += result.severity_counts;
    }

    let total_duration_ms = (crawl_completed - crawl_started)
        .num_milliseconds()
        .max(0) as u64;

    SiteCrawlReport {
        start_url: config.start_url.clone(),
        crawl_started,
        crawl_completed,
        total_duration_ms,
        pages_discovered: counts.discovered(),
        pages_tested: counts.tested,
        pages_skipped: counts.skipped,
        pages_errored: counts.errored,
        // nothing is left crawling once the run returns
        pages_pending: counts.pending + counts.crawling,
        average_accessibility_score: average(&scored, TestCategory::Accessibility),
        average_visual_score: average(&scored, TestCategory::Visual),
        average_responsive_score: average(&scored, TestCategory::Responsive),
        average_overall_score: average(&scored, TestCategory::All),
        severity_totals,
        worst_pages: worst_pages(&scored),
        common_issues: common_issues(&scored),
        page_results,
        config: config.clone(),
        pages,
    }
}

fn average(results: &[&PageTestResult], category: TestCategory) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.score(category)).sum::<f64>() / results.len() as f64
}

fn worst_pages(results: &[&PageTestResult]) -> Vec<String> {
    let mut ranked = results.to_vec();
    ranked.sort_by(|a, b| a.overall_score.total_cmp(&b.overall_score));
    ranked
        .into_iter()
        .take(WORST_PAGES)
        .map(|r| r.url.clone())
        .collect()
}

fn common_issues(results: &[&PageTestResult]) -> Vec<CommonIssue> {
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();
    let mut tally: Vec<CommonIssue> = Vec::new();

    for issue in results.iter().flat_map(|r| r.issues.iter()) {
        let key = (issue.issue_type.as_str(), issue.message.as_str());
        match seen.get(&key) {
            Some(&slot) => tally[slot].count += 1,
            None => {
                seen.insert(key, tally.len());
                tally.push(CommonIssue {
                    issue_type: issue.issue_type.clone(),
                    message: issue.message.clone(),
                    count: 1,
                });
            }
        }
    }

    // stable, so equal counts keep first-seen order
    tally.sort_by(|a, b| b.count.cmp(&a.count));
    tally.truncate(COMMON_ISSUES);
    tally
}

pub fn render(report: &SiteCrawlReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
        ReportFormat::Json => generate_json_report(report).context("Failed to serialize report"),
    }
}

fn section(report: &mut String, title: &str) {
    report.push_str(BAR);
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(BAR);
    report.push_str("\n\n");
}

pub fn generate_text_report(data: &SiteCrawlReport) -> String {
    let mut report = String::new();

    report.push_str(BAR);
    report.push('\n');
    report.push_str("                        PAGEWARDEN SITE CRAWL REPORT\n");
    report.push_str(BAR);
    report.push_str("\n\n");

    report.push_str(&format!("Start URL:    {}\n", data.start_url));
    report.push_str(&format!("Crawl Date:   {}\n", format_timestamp(&data.crawl_started)));
    report.push_str(&format!(
        "Duration:     {:.1} seconds\n\n",
        data.total_duration_ms as f64 / 1000.0
    ));

    report.push_str(&format!("Pages Discovered: {}\n", data.pages_discovered));
    report.push_str(&format!("Pages Tested:     {}\n", data.pages_tested));
    report.push_str(&format!("Pages Skipped:    {}\n", data.pages_skipped));
    report.push_str(&format!("Pages Errored:    {}\n", data.pages_errored));
    if data.pages_pending > 0 {
        report.push_str(&format!("Pages Pending:    {}\n", data.pages_pending));
    }
    report.push('\n');

    section(&mut report, "SCORES (AVERAGE)");
    report.push_str(&format!("  Overall:        {:.0}/100\n", data.average_overall_score));
    report.push_str(&format!("  Accessibility:  {:.0}/100\n", data.average_accessibility_score));
    report.push_str(&format!("  Visual:         {:.0}/100\n", data.average_visual_score));
    report.push_str(&format!("  Responsive:     {:.0}/100\n\n", data.average_responsive_score));

    section(&mut report, "ISSUES");
    let totals = &data.severity_totals;
    report.push_str(&format!("Total Issues: {}\n\n", totals.total()));
    report.push_str(&format!("  [CRITICAL] {}\n", totals.critical));
    report.push_str(&format!("  [SERIOUS]  {}\n", totals.serious));
    report.push_str(&format!("  [MODERATE] {}\n", totals.moderate));
    report.push_str(&format!("  [MINOR]    {}\n\n", totals.minor));

    if !data.worst_pages.is_empty() {
        section(&mut report, "WORST PAGES");
        for url in &data.worst_pages {
            if let Some(result) = data.result_for(url) {
                report.push_str(&format!("  {:>3.0}/100  {}\n", result.overall_score, url));
            }
        }
        report.push('\n');
    }

    if !data.common_issues.is_empty() {
        section(&mut report, "COMMON ISSUES");
        for issue in &data.common_issues {
            report.push_str(&format!(
                "  [{}x] {}: {}\n",
                issue.count, issue.issue_type, issue.message
            ));
        }
        report.push('\n');
    }

    let failures: Vec<&PageTestResult> =
        data.page_results.iter().filter(|r| r.is_error()).collect();
    if !failures.is_empty() {
        section(&mut report, "FAILED PAGES");
        for result in failures {
            report.push_str(&format!("URL:    {}\n", result.url));
            report.push_str(&format!(
                "Error:  {}\n",
                result.error.as_deref().unwrap_or_default()
            ));
            report.push_str(RULE);
            report.push_str("\n\n");
        }
    }

    report.push_str(BAR);
    report.push('\n');
    report.push_str("                          End of Report\n");
    report.push_str(BAR);
    report.push('\n');

    report
}

pub fn generate_markdown_report(data: &SiteCrawlReport) -> String {
    let mut report = String::new();

    report.push_str("# Site Crawl Report\n\n");
    report.push_str(&format!("- **Start URL:** {}\n", data.start_url));
    report.push_str(&format!("- **Crawl Date:** {}\n", format_timestamp(&data.crawl_started)));
    report.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        data.total_duration_ms as f64 / 1000.0
    ));

    report.push_str("## Summary\n\n");
    report.push_str("| Pages | Count |\n|---|---|\n");
    report.push_str(&format!("| Discovered | {} |\n", data.pages_discovered));
    report.push_str(&format!("| Tested | {} |\n", data.pages_tested));
    report.push_str(&format!("| Skipped | {} |\n", data.pages_skipped));
    report.push_str(&format!("| Errored | {} |\n", data.pages_errored));
    report.push_str(&format!("| Pending | {} |\n\n", data.pages_pending));

    report.push_str("## Average Scores\n\n");
    report.push_str("| Category | Score |\n|---|---|\n");
    for category in TestCategory::SCORED {
        report.push_str(&format!(
            "| {} | {:.0} |\n",
            capitalize(&category.to_string()),
            data.average_score(category)
        ));
    }
    report.push_str(&format!("| **Overall** | **{:.0}** |\n\n", data.average_overall_score));

    report.push_str("## Issues by Severity\n\n");
    let totals = &data.severity_totals;
    report.push_str(&format!("- Critical: {}\n", totals.critical));
    report.push_str(&format!("- Serious: {}\n", totals.serious));
    report.push_str(&format!("- Moderate: {}\n", totals.moderate));
    report.push_str(&format!("- Minor: {}\n\n", totals.minor));

    if !data.worst_pages.is_empty() {
        report.push_str("## Worst Pages\n\n");
        for (idx, url) in data.worst_pages.iter().enumerate() {
            let score = data.result_for(url).map(|r| r.overall_score).unwrap_or_default();
            report.push_str(&format!("{}. `{}` ({:.0}/100)\n", idx + 1, url, score));
        }
        report.push('\n');
    }

    if !data.common_issues.is_empty() {
        report.push_str("## Common Issues\n\n");
        report.push_str("| Count | Type | Message |\n|---|---|---|\n");
        for issue in &data.common_issues {
            report.push_str(&format!(
                "| {} | {} | {} |\n",
                issue.count,
                issue.issue_type,
                escape_cell(&issue.message)
            ));
        }
        report.push('\n');
    }

    report.push_str("## Pages\n\n");
    report.push_str("| URL | Status | Depth | Source | Score |\n|---|---|---|---|---|\n");
    for page in &data.pages {
        let score = match data.result_for(&page.url) {
            Some(result) if result.is_error() => "error".to_string(),
            Some(result) => format!("{:.0}", result.overall_score),
            None => "-".to_string(),
        };
        report.push_str(&format!(
            "| {} | {:?} | {} | {:?} | {} |\n",
            page.url, page.status, page.depth, page.source, score
        ));
    }

    report
}

pub fn generate_json_report(data: &SiteCrawlReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Write `crawl_report.json` and `crawl_report.md` into `directory`,
/// creating it if needed. Returns the JSON path.
pub fn save_report(report: &SiteCrawlReport, directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create output directory {}", directory.display()))?;

    let json_path = directory.join(JSON_REPORT_FILE);
    let json = generate_json_report(report).context("Failed to serialize report")?;
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    let markdown_path = directory.join(MARKDOWN_REPORT_FILE);
    fs::write(&markdown_path, generate_markdown_report(report))
        .with_context(|| format!("Failed to write {}", markdown_path.display()))?;

    Ok(json_path)
}

pub fn load_report(path: &Path) -> Result<SiteCrawlReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report {}", path.display()))
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
