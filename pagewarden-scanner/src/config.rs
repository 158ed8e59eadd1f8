//! Crawl configuration.
//!
//! Every field carries a serde default so a partial JSON document (or one
//! holding nothing but `start_url`) deserializes into a usable config.

use crate::analyzer::TestCategory;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    r".*\.(jpg|jpeg|png|gif|svg|ico|css|js|woff|woff2|ttf|eot)$",
    r".*#.*",
    r".*/api/.*",
    r".*logout.*",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub start_url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default)]
    pub additional_routes: Vec<String>,
    #[serde(default = "default_true")]
    pub discover_items: bool,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub same_domain_only: bool,
    /// Seconds to wait between page loads.
    #[serde(default = "default_delay")]
    pub delay_between_requests: f64,
    #[serde(default)]
    pub auth_config: Option<AuthConfig>,
    #[serde(default = "default_categories")]
    pub test_categories: Vec<TestCategory>,
    #[serde(default = "default_true")]
    pub capture_screenshots: bool,
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            additional_routes: Vec::new(),
            discover_items: true,
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            same_domain_only: true,
            delay_between_requests: default_delay(),
            auth_config: None,
            test_categories: default_categories(),
            capture_screenshots: true,
            output_directory: default_output_directory(),
            timeouts: Timeouts::default(),
        }
    }

    /// Negative, non-finite and out-of-range delays mean no delay.
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_between_requests).unwrap_or(Duration::ZERO)
    }

    pub fn runs_category(&self, category: TestCategory) -> bool {
        self.test_categories
            .iter()
            .any(|c| *c == TestCategory::All || *c == category)
    }

    pub fn screenshot_directory(&self) -> PathBuf {
        self.output_directory.join("screenshots")
    }
}

/// Login flow settings. Selectors are plain CSS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_username_selector")]
    pub username_selector: String,
    #[serde(default = "default_password_selector")]
    pub password_selector: String,
    #[serde(default = "default_submit_selector")]
    pub submit_selector: String,
    #[serde(default)]
    pub wait_for_url: Option<String>,
    #[serde(default)]
    pub wait_for_selector: Option<String>,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_url: None,
            username: username.into(),
            password: password.into(),
            username_selector: default_username_selector(),
            password_selector: default_password_selector(),
            submit_selector: default_submit_selector(),
            wait_for_url: None,
            wait_for_selector: None,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_interaction_ms")]
    pub interaction_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Timeouts {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn interaction(&self) -> Duration {
        Duration::from_millis(self.interaction_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// No settle pauses and short bounds; used by tests against local servers.
    pub fn immediate() -> Self {
        Self {
            navigation_ms: 2_000,
            interaction_ms: 1_000,
            settle_ms: 0,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            interaction_ms: default_interaction_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pages() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_delay() -> f64 {
    0.5
}

fn default_exclude_patterns() -> Vec<String> {
    DEFAULT_EXCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_categories() -> Vec<TestCategory> {
    vec![TestCategory::All]
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./pagewarden_output")
}

fn default_username_selector() -> String {
    r#"input[name="username"]"#.to_string()
}

fn default_password_selector() -> String {
    r#"input[name="password"]"#.to_string()
}

fn default_submit_selector() -> String {
    r#"button[type="submit"]"#.to_string()
}

fn default_navigation_ms() -> u64 {
    30_000
}

fn default_interaction_ms() -> u64 {
    5_000
}

fn default_settle_ms() -> u64 {
    2_000
}
