//! WCAG checks that can be answered from markup alone.

use super::{inline_style, selector, snippet};
use crate::analyzer::{Analyzer, Issue, PageSnapshot, Severity, TestCategory};
use crate::error::Result;
use scraper::{ElementRef, Html};

const VAGUE_LINK_TEXT: &[&str] = &["click here", "here", "read more", "learn more", "more"];

pub struct MarkupAccessibility;

impl Analyzer for MarkupAccessibility {
    fn name(&self) -> &str {
        "markup-accessibility"
    }

    fn category(&self) -> TestCategory {
        TestCategory::Accessibility
    }

    fn analyze(&self, page: &PageSnapshot) -> Result<Vec<Issue>> {
        let document = Html::parse_document(&page.html);
        let mut issues = Vec::new();

        check_images(&document, &mut issues);
        check_labels(&document, &mut issues);
        check_headings(&document, &mut issues);
        check_main_landmark(&document, &mut issues);
        check_link_text(&document, &mut issues);
        check_inline_contrast(&document, &mut issues);

        Ok(issues)
    }
}

fn issue(issue_type: &str, severity: Severity, message: impl Into<String>, wcag: &str) -> Issue {
    Issue::new(TestCategory::Accessibility, issue_type, severity, message).with_wcag(wcag)
}

fn check_images(document: &Html, issues: &mut Vec<Issue>) {
    for img in document.select(&selector("img")) {
        if img.value().attr("alt").is_none() && img.value().attr("role").is_none() {
            issues.push(
                issue("missing-alt", Severity::Serious, "Image missing alt text", "1.1.1")
                    .with_element(snippet(&img)),
            );
        }
    }
}

fn check_labels(document: &Html, issues: &mut Vec<Issue>) {
    for field in document.select(&selector("input, select, textarea")) {
        let kind = field.value().attr("type").unwrap_or_default();
        if matches!(kind, "hidden" | "submit" | "button" | "reset" | "image") {
            continue;
        }

        let labelled_by_for = field.value().attr("id").is_some_and(|id| {
            document
                .select(&selector("label[for]"))
                .any(|label| label.value().attr("for") == Some(id))
        });
        let wrapped = field
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().name() == "label");
        let aria = field.value().attr("aria-label").is_some()
            || field.value().attr("aria-labelledby").is_some();

        if !(labelled_by_for || wrapped || aria) {
            issues.push(
                issue("missing-label", Severity::Serious, "Form input missing label", "1.3.1")
                    .with_element(snippet(&field)),
            );
        }
    }
}

fn check_headings(document: &Html, issues: &mut Vec<Issue>) {
    let mut last_level = 0u8;
    for heading in document.select(&selector("h1, h2, h3, h4, h5, h6")) {
        let level = heading.value().name()[1..].parse::<u8>().unwrap_or(1);
        if last_level > 0 && level > last_level + 1 {
            issues.push(
                issue(
                    "heading-skip",
                    Severity::Moderate,
                    format!("Heading level skipped from h{} to h{}", last_level, level),
                    "1.3.1",
                )
                .with_element(snippet(&heading)),
            );
        }
        last_level = level;
    }
}

fn check_main_landmark(document: &Html, issues: &mut Vec<Issue>) {
    if document
        .select(&selector(r#"main, [role="main"]"#))
        .next()
        .is_none()
    {
        issues.push(
            issue("missing-main", Severity::Moderate, "Page missing main landmark", "1.3.1")
                .with_element("body"),
        );
    }
}

fn check_link_text(document: &Html, issues: &mut Vec<Issue>) {
    for link in document.select(&selector("a")) {
        let text = link.text().collect::<String>();
        let text = text.trim();
        if VAGUE_LINK_TEXT.contains(&text.to_lowercase().as_str()) {
            issues.push(
                issue(
                    "non-descriptive-link",
                    Severity::Moderate,
                    format!("Link text \"{}\" is not descriptive", text),
                    "2.4.4",
                )
                .with_element(snippet(&link)),
            );
        }
    }
}

fn check_inline_contrast(document: &Html, issues: &mut Vec<Issue>) {
    for el in document.select(&selector("[style]")) {
        let style = inline_style(&el);
        let lookup = |name: &str| {
            style
                .iter()
                .find(|(prop, _)| prop == name)
                .map(|(_, value)| value.as_str())
        };
        let has_text = !el.text().collect::<String>().trim().is_empty();

        if has_text
            && let (Some(fg), Some(bg)) = (lookup("color"), lookup("background-color"))
            && fg == bg
        {
            issues.push(
                issue(
                    "contrast-issue",
                    Severity::Serious,
                    "Text may have insufficient color contrast",
                    "1.4.3",
                )
                .with_element(snippet(&el)),
            );
        }
    }
}
