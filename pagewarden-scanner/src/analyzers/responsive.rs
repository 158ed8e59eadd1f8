//! Responsive checks: viewport meta and layouts pinned wider than a desktop.

use super::{inline_style, px, selector, snippet};
use crate::analyzer::{Analyzer, Issue, PageSnapshot, Severity, TestCategory};
use crate::error::Result;
use scraper::Html;

const MAX_FIXED_WIDTH_PX: f64 = 1920.0;

pub struct MarkupResponsive;

impl Analyzer for MarkupResponsive {
    fn name(&self) -> &str {
        "markup-responsive"
    }

    fn category(&self) -> TestCategory {
        TestCategory::Responsive
    }

    fn analyze(&self, page: &PageSnapshot) -> Result<Vec<Issue>> {
        let document = Html::parse_document(&page.html);
        let mut issues = Vec::new();

        match document.select(&selector(r#"meta[name="viewport"]"#)).next() {
            None => issues.push(Issue::new(
                TestCategory::Responsive,
                "missing-viewport",
                Severity::Serious,
                "Page missing viewport meta tag",
            )),
            Some(meta) => {
                let content = meta
                    .value()
                    .attr("content")
                    .unwrap_or_default()
                    .replace(' ', "")
                    .to_lowercase();
                if !content.contains("width=device-width") {
                    issues.push(
                        Issue::new(
                            TestCategory::Responsive,
                            "viewport-config",
                            Severity::Moderate,
                            "Viewport should include width=device-width",
                        )
                        .with_element(snippet(&meta)),
                    );
                }
            }
        }

        for el in document.select(&selector("[style]")) {
            let style = inline_style(&el);
            let value_of = |name: &str| {
                style
                    .iter()
                    .find(|(prop, _)| prop == name)
                    .map(|(_, value)| value.as_str())
            };

            let positioned = matches!(value_of("position"), Some("fixed" | "absolute"));
            if !positioned
                && let Some(width) = value_of("width").and_then(px)
                && width > MAX_FIXED_WIDTH_PX
            {
                issues.push(
                    Issue::new(
                        TestCategory::Responsive,
                        "fixed-width",
                        Severity::Moderate,
                        format!("Element has fixed width of {}px", width),
                    )
                    .with_element(snippet(&el)),
                );
            }
        }

        Ok(issues)
    }
}
