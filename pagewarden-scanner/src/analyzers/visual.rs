use super::{inline_style, px, selector, snippet};
use crate::analyzer::{Analyzer, Issue, PageSnapshot, Severity, TestCategory};
use crate::error::Result;
use scraper::Html;

const MIN_FONT_PX: f64 = 12.0;
const Z_INDEX_CEILING: i64 = 9999;
const Z_INDEX_TOLERANCE: usize = 3;

pub struct MarkupVisual;

impl Analyzer for MarkupVisual {
    fn name(&self) -> &str {
        "markup-visual"
    }

    fn category(&self) -> TestCategory {
        TestCategory::Visual
    }

    fn analyze(&self, page: &PageSnapshot) -> Result<Vec<Issue>> {
        let document = Html::parse_document(&page.html);
        let mut issues = Vec::new();

        for img in document.select(&selector("img")) {
            let src = img.value().attr("src").map(str::trim).unwrap_or_default();
            if src.is_empty() {
                issues.push(
                    Issue::new(
                        TestCategory::Visual,
                        "broken-image",
                        Severity::Moderate,
                        "Image has no source",
                    )
                    .with_element(snippet(&img)),
                );
            }
        }

        let mut stacked = 0;
        for el in document.select(&selector("[style]")) {
            let style = inline_style(&el);
            let has_text = !el.text().collect::<String>().trim().is_empty();

            for (prop, value) in &style {
                match prop.as_str() {
                    "font-size" if has_text => {
                        if let Some(size) = px(value)
                            && size < MIN_FONT_PX
                        {
                            issues.push(
                                Issue::new(
                                    TestCategory::Visual,
                                    "small-text",
                                    Severity::Minor,
                                    format!("Text size {}px may be too small", size),
                                )
                                .with_element(snippet(&el)),
                            );
                        }
                    }
                    "z-index" => {
                        if value.parse::<i64>().is_ok_and(|z| z > Z_INDEX_CEILING) {
                            stacked += 1;
                        }
                    }
                    _ => {}
                }
            }
        }

        if stacked > Z_INDEX_TOLERANCE {
            issues.push(Issue::new(
                TestCategory::Visual,
                "z-index-complexity",
                Severity::Minor,
                format!("{} elements with very high z-index values", stacked),
            ));
        }

        Ok(issues)
    }
}
