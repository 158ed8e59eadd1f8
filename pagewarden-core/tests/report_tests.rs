// Tests for report aggregation, rendering and persistence

use chrono::{Duration, TimeZone, Utc};
use pagewarden_core::report::{
    JSON_REPORT_FILE, MARKDOWN_REPORT_FILE, ReportFormat, aggregate, generate_markdown_report,
    generate_text_report, load_report, render, save_report,
};
use pagewarden_scanner::{
    CrawlConfig, CrawledPage, Issue, PageSource, PageStatus, PageTestResult, Severity,
    SeverityCounts, TestCategory,
};

// ============================================================================
// Helpers
// ============================================================================

const START: &str = "https://site.test";

fn config() -> CrawlConfig {
    CrawlConfig::new(START)
}

fn page(path: &str, status: PageStatus) -> CrawledPage {
    let mut page = CrawledPage::new(
        format!("{}{}", START, path),
        1,
        Some(START.to_string()),
        PageSource::Link,
    );
    page.status = status;
    page
}

fn result(path: &str, overall: f64, issues: Vec<Issue>) -> PageTestResult {
    let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    PageTestResult {
        url: format!("{}{}", START, path),
        title: Some(path.to_string()),
        tested_at: started,
        duration_ms: 40,
        screenshot_path: None,
        accessibility_score: overall,
        visual_score: 100.0,
        responsive_score: 100.0,
        overall_score: overall,
        severity_counts: SeverityCounts::tally(&issues),
        passed: issues.iter().all(|i| i.severity > Severity::Serious),
        issues,
        error: None,
    }
}

fn errored(path: &str) -> PageTestResult {
    PageTestResult::failed(
        format!("{}{}", START, path),
        None,
        Utc::now(),
        5,
        "navigation timed out".to_string(),
    )
}

fn issue(issue_type: &str, message: &str) -> Issue {
    Issue::new(TestCategory::Accessibility, issue_type, Severity::Moderate, message)
}

fn times() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
    let started = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    (started, started + Duration::milliseconds(4_300))
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("json"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("markdown"), Some(ReportFormat::Markdown));
    assert_eq!(ReportFormat::from_str("md"), Some(ReportFormat::Markdown));
}

#[test]
fn test_report_format_from_str_case_insensitive() {
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("Text"), Some(ReportFormat::Text));
}

#[test]
fn test_report_format_from_str_unknown() {
    assert_eq!(ReportFormat::from_str("csv"), None);
    assert_eq!(ReportFormat::from_str(""), None);
}

// ============================================================================
// Aggregation Tests
// ============================================================================

#[test]
fn test_counts_follow_page_statuses() {
    let pages = vec![
        page("", PageStatus::Tested),
        page("/a", PageStatus::Tested),
        page("/b", PageStatus::Error),
        page("/c", PageStatus::Skipped),
        page("/d", PageStatus::Pending),
        page("/e", PageStatus::Pending),
    ];
    let (started, completed) = times();

    let report = aggregate(&config(), pages, Vec::new(), started, completed);

    assert_eq!(report.pages_discovered, 6);
    assert_eq!(report.pages_tested, 2);
    assert_eq!(report.pages_errored, 1);
    assert_eq!(report.pages_skipped, 1);
    assert_eq!(report.pages_pending, 2);
    assert_eq!(
        report.pages_discovered,
        report.pages_tested + report.pages_skipped + report.pages_errored + report.pages_pending
    );
    assert_eq!(report.total_duration_ms, 4_300);
    assert_eq!(report.pages.len(), 6);
}

#[test]
fn test_empty_results_average_to_zero() {
    let (started, completed) = times();
    let report = aggregate(&config(), Vec::new(), Vec::new(), started, completed);

    assert_eq!(report.average_overall_score, 0.0);
    assert_eq!(report.average_accessibility_score, 0.0);
    assert!(report.worst_pages.is_empty());
    assert!(report.common_issues.is_empty());
    assert!(!report.has_critical());
}

#[test]
fn test_errored_results_excluded_from_averages_and_ranking() {
    let results = vec![
        result("/a", 80.0, Vec::new()),
        errored("/broken"),
        result("/b", 60.0, Vec::new()),
    ];
    let (started, completed) = times();

    let report = aggregate(&config(), Vec::new(), results, started, completed);

    assert_eq!(report.average_overall_score, 70.0);
    assert_eq!(report.average_accessibility_score, 70.0);
    assert_eq!(report.average_visual_score, 100.0);
    assert_eq!(report.page_results.len(), 3);
    assert_eq!(
        report.worst_pages,
        vec![format!("{}/b", START), format!("{}/a", START)]
    );
}

#[test]
fn test_worst_pages_ascending_and_capped() {
    let scores = [90.0, 40.0, 75.0, 10.0, 100.0, 55.0, 30.0];
    let results = scores
        .iter()
        .enumerate()
        .map(|(i, score)| result(&format!("/p{}", i), *score, Vec::new()))
        .collect();
    let (started, completed) = times();

    let report = aggregate(&config(), Vec::new(), results, started, completed);

    let expected: Vec<String> = [3, 6, 1, 5, 2]
        .iter()
        .map(|i| format!("{}/p{}", START, i))
        .collect();
    assert_eq!(report.worst_pages, expected);
}

#[test]
fn test_common_issues_ranked_by_count_then_first_seen() {
    let mut results = Vec::new();
    // twelve distinct issues; "i5" and "i9" show up on three pages, "i2" on two
    for page_no in 0..3 {
        let mut issues = vec![issue("i5", "five"), issue("i9", "nine")];
        if page_no == 0 {
            issues.extend(
                (0..12)
                    .filter(|n| *n != 5 && *n != 9)
                    .map(|n| issue(&format!("i{}", n), "x")),
            );
        }
        if page_no == 1 {
            issues.push(issue("i2", "x"));
        }
        results.push(result(&format!("/p{}", page_no), 50.0, issues));
    }
    let (started, completed) = times();

    let report = aggregate(&config(), Vec::new(), results, started, completed);
    let ranked: Vec<(&str, usize)> = report
        .common_issues
        .iter()
        .map(|c| (c.issue_type.as_str(), c.count))
        .collect();

    assert_eq!(ranked.len(), 10);
    assert_eq!(ranked[0], ("i5", 3));
    assert_eq!(ranked[1], ("i9", 3));
    assert_eq!(ranked[2], ("i2", 2));
    // remaining singles keep the order they were first seen in
    assert_eq!(ranked[3], ("i0", 1));
    assert_eq!(ranked[4], ("i1", 1));
    assert_eq!(ranked[5], ("i3", 1));
}

#[test]
fn test_same_type_different_message_counted_separately() {
    let results = vec![result(
        "/a",
        80.0,
        vec![
            issue("small-text", "Text size 9px may be too small"),
            issue("small-text", "Text size 10px may be too small"),
            issue("small-text", "Text size 9px may be too small"),
        ],
    )];
    let (started, completed) = times();

    let report = aggregate(&config(), Vec::new(), results, started, completed);

    assert_eq!(report.common_issues.len(), 2);
    assert_eq!(report.common_issues[0].count, 2);
    assert_eq!(report.common_issues[0].message, "Text size 9px may be too small");
}

#[test]
fn test_severity_totals_and_critical_flag() {
    let critical = Issue::new(TestCategory::Visual, "broken-image", Severity::Critical, "x");
    let results = vec![
        result("/a", 90.0, vec![issue("heading-skip", "h1 to h3")]),
        result("/b", 40.0, vec![critical, issue("missing-main", "no main")]),
    ];
    let (started, completed) = times();

    let report = aggregate(&config(), Vec::new(), results, started, completed);

    assert_eq!(report.severity_totals.critical, 1);
    assert_eq!(report.severity_totals.moderate, 2);
    assert_eq!(report.severity_totals.total(), 3);
    assert!(report.has_critical());
}

// ============================================================================
// Rendering Tests
// ============================================================================

fn sample_report() -> pagewarden_core::SiteCrawlReport {
    let pages = vec![page("", PageStatus::Tested), page("/broken", PageStatus::Tested)];
    let results = vec![
        result("", 90.0, vec![issue("missing-alt", "Image missing alt | text")]),
        errored("/broken"),
    ];
    let (started, completed) = times();
    aggregate(&config(), pages, results, started, completed)
}

#[test]
fn test_text_report_sections() {
    let text = generate_text_report(&sample_report());

    assert!(text.contains("PAGEWARDEN SITE CRAWL REPORT"));
    assert!(text.contains("Start URL:    https://site.test"));
    assert!(text.contains("Duration:     4.3 seconds"));
    assert!(text.contains("WORST PAGES"));
    assert!(text.contains("[1x] missing-alt"));
    assert!(text.contains("FAILED PAGES"));
    assert!(text.contains("navigation timed out"));
    assert!(text.contains("End of Report"));
}

#[test]
fn test_markdown_report_tables() {
    let markdown = generate_markdown_report(&sample_report());

    assert!(markdown.starts_with("# Site Crawl Report"));
    assert!(markdown.contains("| Tested | 2 |"));
    assert!(markdown.contains("| Accessibility | 90 |"));
    assert!(markdown.contains("Image missing alt \\| text"));
    assert!(markdown.contains("| https://site.test/broken | Tested | 1 | Link | error |"));
}

#[test]
fn test_render_json_is_parseable() {
    let rendered = render(&sample_report(), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(value["start_url"], "https://site.test");
    assert_eq!(value["common_issues"][0]["type"], "missing-alt");
    assert_eq!(value["page_results"][1]["error"], "navigation timed out");
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[test]
fn test_save_and_load_report_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("nested").join("out");
    let report = sample_report();

    let json_path = save_report(&report, &output).unwrap();

    assert_eq!(json_path, output.join(JSON_REPORT_FILE));
    assert!(output.join(MARKDOWN_REPORT_FILE).exists());
    let loaded = load_report(&json_path).unwrap();
    assert_eq!(loaded, report);
}

#[test]
fn test_fractional_scores_survive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let pages = vec![
        page("/a", PageStatus::Tested),
        page("/b", PageStatus::Tested),
        page("/c", PageStatus::Tested),
    ];
    let mut a = result("/a", 96.66666666666667, Vec::new());
    a.accessibility_score = 90.0;
    a.visual_score = 100.0;
    let mut b = result("/b", 98.33333333333333, Vec::new());
    b.visual_score = 95.0;
    let c = result("/c", 93.33333333333333, Vec::new());
    let (started, completed) = times();
    let report = aggregate(&config(), pages, vec![a, b, c], started, completed);

    let loaded = load_report(&save_report(&report, dir.path()).unwrap()).unwrap();

    assert_eq!(loaded.page_results[0].overall_score, 96.66666666666667);
    assert_eq!(loaded.average_overall_score, report.average_overall_score);
    assert_eq!(loaded, report);
}

#[test]
fn test_load_report_rejects_garbage() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "{ not json").unwrap();

    let err = load_report(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse report"));
}

#[test]
fn test_load_report_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_report(&dir.path().join("absent.json")).is_err());
}
