pub mod analyzer;
pub mod analyzers;
pub mod auth;
pub mod browser;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod http;
pub mod registry;
pub mod result;
pub mod tester;

#[cfg(test)]
pub(crate) mod fake;

pub use analyzer::{Analyzer, AnalyzerSet, Issue, PageSnapshot, Severity, TestCategory};
pub use auth::{AuthSession, authenticate};
pub use browser::{BrowserContext, PageDriver, WaitPolicy};
pub use config::{AuthConfig, CrawlConfig, Timeouts};
pub use crawler::{CrawlOutcome, Crawler, ProgressCallback};
pub use error::ScanError;
pub use http::HttpBrowser;
pub use registry::{CrawledPage, PageRegistry, PageSource, PageStatus, StatusCounts};
pub use result::{PageTestResult, SeverityCounts};
pub use tester::PageTester;
