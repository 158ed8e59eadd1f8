use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Accessibility,
    Visual,
    Responsive,
    All,
}

impl TestCategory {
    /// Categories that produce a score.
    pub const SCORED: [TestCategory; 3] = [
        TestCategory::Accessibility,
        TestCategory::Visual,
        TestCategory::Responsive,
    ];

    /// Points deducted from the category score per issue.
    pub fn penalty(self) -> f64 {
        match self {
            TestCategory::Accessibility => 10.0,
            TestCategory::Visual | TestCategory::Responsive => 5.0,
            TestCategory::All => 0.0,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "accessibility" | "a11y" => Some(TestCategory::Accessibility),
            "visual" => Some(TestCategory::Visual),
            "responsive" => Some(TestCategory::Responsive),
            "all" => Some(TestCategory::All),
            _ => None,
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestCategory::Accessibility => "accessibility",
            TestCategory::Visual => "visual",
            TestCategory::Responsive => "responsive",
            TestCategory::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Serious,
    Moderate,
    Minor,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Critical => "critical",
            Severity::Serious => "serious",
            Severity::Moderate => "moderate",
            Severity::Minor => "minor",
        };
        f.write_str(name)
    }
}

/// One finding, whichever analyzer produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: TestCategory,
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcag_ref: Option<String>,
}

impl Issue {
    pub fn new(
        category: TestCategory,
        issue_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            issue_type: issue_type.into(),
            severity,
            message: message.into(),
            element: None,
            wcag_ref: None,
        }
    }

    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    pub fn with_wcag(mut self, reference: impl Into<String>) -> Self {
        self.wcag_ref = Some(reference.into());
        self
    }
}

/// The loaded page as every analyzer of one test pass sees it.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub html: String,
}

/// An analyzer consumed by the per-page test runner.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> TestCategory;

    fn analyze(&self, page: &PageSnapshot) -> Result<Vec<Issue>>;
}

/// The analyzers a run dispatches to, grouped by category at run time.
pub struct AnalyzerSet {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AnalyzerSet {
    pub fn empty() -> Self {
        Self {
            analyzers: Vec::new(),
        }
    }

    /// The markup analyzers shipped with the scanner.
    pub fn builtin() -> Self {
        Self::empty()
            .with(crate::analyzers::accessibility::MarkupAccessibility)
            .with(crate::analyzers::visual::MarkupVisual)
            .with(crate::analyzers::responsive::MarkupResponsive)
    }

    pub fn with(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    pub fn for_category(&self, category: TestCategory) -> impl Iterator<Item = &dyn Analyzer> {
        self.analyzers
            .iter()
            .map(|a| a.as_ref())
            .filter(move |a| a.category() == category)
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}

impl Default for AnalyzerSet {
    fn default() -> Self {
        Self::builtin()
    }
}
